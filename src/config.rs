//! Configuration for form extraction requests.

use std::path::{Path, PathBuf};

/// Name of the per-request directory holding machine-readable copies.
pub const DECRYPTED_DIR: &str = "decrypted";

/// Extraction request configuration.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Root under which request directories are created.
    pub work_root: PathBuf,

    /// Identifier of this request; names its working directory.
    pub request_id: String,

    /// Country-code CSV replacing the bundled table.
    pub country_codes: Option<PathBuf>,

    /// Keep decrypted copies after processing.
    pub keep_intermediate: bool,

    /// Also read the visa decision label file.
    pub include_label: bool,

    /// Glob selecting which files of the input directory are processed.
    pub file_pattern: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create new configuration with defaults.
    ///
    /// Each call draws a fresh request id.
    pub fn new() -> Self {
        Self {
            work_root: std::env::temp_dir().join(crate::NAME),
            request_id: uuid::Uuid::new_v4().to_string(),
            country_codes: None,
            keep_intermediate: false,
            include_label: false,
            file_pattern: "*".to_string(),
        }
    }

    /// Set the working root.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    /// Set the request id.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Use a country-code CSV instead of the bundled one.
    pub fn with_country_codes(mut self, path: impl AsRef<Path>) -> Self {
        self.country_codes = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep intermediate files.
    pub fn with_keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    /// Include the label file.
    pub fn with_label(mut self, include: bool) -> Self {
        self.include_label = include;
        self
    }

    /// Restrict processed files to a glob.
    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    /// Working directory of this request.
    pub fn request_dir(&self) -> PathBuf {
        self.work_root.join(&self.request_id)
    }

    /// Directory receiving machine-readable copies.
    pub fn decrypted_dir(&self) -> PathBuf {
        self.request_dir().join(DECRYPTED_DIR)
    }
}
