//! End-to-end extraction of a visa application directory.
//!
//! ```text
//! upload dir ──process_directory──▶ <work_root>/<request>/decrypted
//!                                       │
//!     5257 PDF ─▶ extract ─▶ clean ─▶ flatten ─▶ summarize ─▶ 5257E chain ─┐
//!                                                                (certificate date)
//!     5645 PDF ─▶ extract ─▶ clean ─▶ flatten ─▶ summarize ─▶ 5645E chain ◀┘
//! ```

use crate::compose::{default_compose, list_files, process_directory};
use crate::config::ExtractionConfig;
use crate::countries::CountryCodes;
use crate::error::{Error, Result};
use crate::flatten::xml_to_flattened;
use crate::forms::{tables, DocType};
use crate::record::FlatRecord;
use crate::summarize::summarize;
use crate::transform::{canada_5257e, canada_5645e, label};
use crate::xfa::{clean_xml, XfaExtractor};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-request form preprocessor.
///
/// Holds the base date of the application: the certificate issue date of the
/// first IMM 5257E processed, which stands in for "today" on the forms that
/// follow.
#[derive(Debug, Clone)]
pub struct CanadaPreprocessor {
    base_date: Option<NaiveDateTime>,
    countries: CountryCodes,
}

impl CanadaPreprocessor {
    /// Create a preprocessor using `countries` for code lookups.
    pub fn new(countries: CountryCodes) -> Self {
        Self {
            base_date: None,
            countries,
        }
    }

    /// Create a preprocessor with the bundled country table.
    pub fn with_bundled_countries() -> Result<Self> {
        Ok(Self::new(CountryCodes::bundled()?))
    }

    /// Base date picked up from the applicant form, if any.
    pub fn base_date(&self) -> Option<NaiveDateTime> {
        self.base_date
    }

    /// Resolve a form country code to its name.
    pub fn convert_country_code_to_name(&self, code: &str) -> &str {
        self.countries.name_of(code)
    }

    /// Extract and normalize one file of type `doc_type`.
    pub fn file_specific_basic_transform(
        &mut self,
        doc_type: DocType,
        path: impl AsRef<Path>,
    ) -> Result<FlatRecord> {
        let path = path.as_ref();
        match doc_type {
            DocType::Canada5257E => {
                let (record, issued) = canada_5257e::transform(read_form(path, doc_type)?)?;
                if self.base_date.is_none() {
                    self.base_date = issued;
                }
                Ok(record)
            },
            DocType::Canada5645E => {
                if self.base_date.is_none() {
                    log::debug!("No base date yet, {} signature date will not be filled", doc_type);
                }
                canada_5645e::transform(read_form(path, doc_type)?, self.base_date)
            },
            DocType::CanadaLabel => label::transform(path),
            DocType::Canada => Err(Error::UnsupportedDocument(format!(
                "{} has no transform chain",
                doc_type
            ))),
        }
    }
}

/// Extract, clean, flatten and abbreviate an XFA form.
///
/// The returned record carries the raw form values under their short keys;
/// no field transform has run yet.
pub fn read_form(path: impl AsRef<Path>, doc_type: DocType) -> Result<FlatRecord> {
    xfa_cutoff(doc_type)?;
    let raw = XfaExtractor::extract_raw_content(path)?;
    read_datasets(&raw, doc_type)
}

/// Clean, flatten and abbreviate an already extracted datasets packet.
pub fn read_datasets(raw: &str, doc_type: DocType) -> Result<FlatRecord> {
    let cutoff = xfa_cutoff(doc_type)?;
    let xml = clean_xml(raw, doc_type)?;
    let flat = xml_to_flattened(&xml)?;
    log::debug!("Flattened {} into {} keys", doc_type, flat.len());

    Ok(summarize(
        flat,
        cutoff,
        tables::key_abbreviations(doc_type)?,
        tables::value_abbreviations(doc_type)?,
    ))
}

fn xfa_cutoff(doc_type: DocType) -> Result<&'static str> {
    doc_type
        .cutoff_term()
        .ok_or_else(|| Error::UnsupportedDocument(format!("{} is not an XFA form", doc_type)))
}

/// Normalized records of one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormBundle {
    /// IMM 5257E record
    #[serde(rename = "CANADA_5257E")]
    pub applicant: FlatRecord,
    /// IMM 5645E record
    #[serde(rename = "CANADA_5645E")]
    pub family: FlatRecord,
    /// Visa decision, when requested
    #[serde(rename = "CANADA_LABEL", skip_serializing_if = "Option::is_none")]
    pub label: Option<FlatRecord>,
}

impl FormBundle {
    /// Union of all records, applicant keys first.
    ///
    /// The forms use disjoint key spaces; should a key repeat, the first
    /// value is kept.
    pub fn merged(&self) -> FlatRecord {
        let mut merged = self.applicant.clone();
        for record in std::iter::once(&self.family).chain(self.label.as_ref()) {
            for (key, value) in record {
                if merged.contains_key(key) {
                    log::warn!("Key '{}' present in more than one form, keeping the first", key);
                    continue;
                }
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Pretty-printed JSON keyed by document type name.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write `record` as a two-row CSV: keys, then values.
pub fn write_record_csv(record: &FlatRecord, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(record.keys())?;
    writer.write_record(record.values().map(|v| v.to_string()))?;
    writer.flush()?;
    Ok(())
}

fn find_marked(files: &[PathBuf], marker: &str) -> Option<PathBuf> {
    files
        .iter()
        .find(|f| {
            f.file_name()
                .map(|n| n.to_string_lossy().contains(marker))
                .unwrap_or(false)
        })
        .cloned()
}

fn require(files: &[PathBuf], doc_type: DocType, dir: &Path) -> Result<PathBuf> {
    let marker = doc_type.file_marker().unwrap_or_default();
    find_marked(files, marker).ok_or_else(|| Error::MissingDocument {
        marker: marker.to_string(),
        dir: dir.to_path_buf(),
    })
}

fn required_types(config: &ExtractionConfig) -> Vec<DocType> {
    let mut types = vec![DocType::Canada5257E, DocType::Canada5645E];
    if config.include_label {
        types.push(DocType::CanadaLabel);
    }
    types
}

/// Extract every form of the application in `src_dir`.
///
/// The directory must hold a file whose name contains `5257` and one whose
/// name contains `5645` (and `label` when the label is included); this is
/// checked before anything is written. Files are made machine readable into
/// the request directory, which is removed afterwards unless
/// `keep_intermediate` is set.
pub fn process(src_dir: impl AsRef<Path>, config: &ExtractionConfig) -> Result<FormBundle> {
    let src_dir = src_dir.as_ref();
    log::info!("Starting extraction of {} (request {})", src_dir.display(), config.request_id);

    let sources = list_files(src_dir)?;
    for doc_type in required_types(config) {
        require(&sources, doc_type, src_dir)?;
    }

    let countries = match &config.country_codes {
        Some(path) => CountryCodes::from_path(path)?,
        None => CountryCodes::bundled()?,
    };

    let result = extract_request(src_dir, config, countries);

    if !config.keep_intermediate {
        let request_dir = config.request_dir();
        if let Err(e) = fs::remove_dir_all(&request_dir) {
            log::warn!("Could not remove {}: {}", request_dir.display(), e);
        }
    }

    if result.is_ok() {
        log::info!("Finished extraction of {}", src_dir.display());
    }
    result
}

fn extract_request(
    src_dir: &Path,
    config: &ExtractionConfig,
    countries: CountryCodes,
) -> Result<FormBundle> {
    let dst_dir = config.decrypted_dir();
    let written = process_directory(src_dir, &dst_dir, &default_compose(), &config.file_pattern)?;

    let mut preprocessor = CanadaPreprocessor::new(countries);

    let path = require(&written, DocType::Canada5257E, &dst_dir)?;
    log::info!("Processing {}", DocType::Canada5257E);
    let applicant = preprocessor.file_specific_basic_transform(DocType::Canada5257E, path)?;

    let path = require(&written, DocType::Canada5645E, &dst_dir)?;
    log::info!("Processing {}", DocType::Canada5645E);
    let family = preprocessor.file_specific_basic_transform(DocType::Canada5645E, path)?;

    let label = if config.include_label {
        let path = require(&written, DocType::CanadaLabel, &dst_dir)?;
        Some(preprocessor.file_specific_basic_transform(DocType::CanadaLabel, path)?)
    } else {
        None
    };

    Ok(FormBundle {
        applicant,
        family,
        label,
    })
}
