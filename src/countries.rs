//! Country code lookup.
//!
//! The XFA forms store countries as form-specific three-digit codes taken
//! from their lookup-value lists. A two-column CSV (`code,name`) maps them to
//! names; a small table ships with the crate.

use crate::error::{Error, Result};
use crate::forms::fill;
use indexmap::IndexMap;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

const BUNDLED_CSV: &str = include_str!("../data/canada-country-code-to-name.csv");

#[derive(Debug, Deserialize)]
struct CountryRow {
    code: String,
    name: String,
}

/// Code to country name table.
#[derive(Debug, Clone, Default)]
pub struct CountryCodes {
    names: IndexMap<String, String>,
}

impl CountryCodes {
    /// The table bundled with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_reader(BUNDLED_CSV.as_bytes())
    }

    /// Load a `code,name` CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            Error::ConfigLookup(format!("cannot open country codes {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    /// Load a `code,name` CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut names = IndexMap::new();
        for row in csv_reader.deserialize() {
            let row: CountryRow =
                row.map_err(|e| Error::ConfigLookup(format!("bad country code row: {}", e)))?;
            names.insert(row.code, row.name);
        }
        log::debug!("Loaded {} country codes", names.len());
        Ok(Self { names })
    }

    /// Number of known codes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no codes are loaded.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve `code` to a country name.
    ///
    /// An exact match wins; otherwise the first code containing `code` is
    /// used. Unknown codes resolve to `"Unknown"`.
    pub fn name_of(&self, code: &str) -> &str {
        let code = code.trim();
        if let Some(name) = self.names.get(code) {
            return name;
        }
        if !code.is_empty() {
            if let Some((_, name)) = self.names.iter().find(|(known, _)| known.contains(code)) {
                return name;
            }
        }
        log::debug!("Country code '{}' not found", code);
        fill::COUNTRY_CODE
    }
}
