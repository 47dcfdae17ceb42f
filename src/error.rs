//! Error types for form extraction.
//!
//! This module defines all error types that can occur while extracting,
//! cleaning, flattening and transforming visa application forms.

use std::path::PathBuf;

/// Result type alias for form extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during form processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The PDF could not be parsed, or carries no usable XFA datasets packet
    #[error("Malformed PDF: {0}")]
    MalformedPdf(String),

    /// The XFA XML could not be cleaned into a parseable document
    #[error("XML cleaning failed: {0}")]
    XmlCleaning(String),

    /// A field value could not be coerced to its target type
    #[error("Cannot coerce field '{field}' (value '{value}'): {reason}")]
    FieldCoercion {
        /// Flattened key of the offending field
        field: String,
        /// Raw value as found in the record
        value: String,
        /// What the coercion expected
        reason: String,
    },

    /// A constant table or auxiliary lookup is missing or malformed
    #[error("Configuration lookup failed: {0}")]
    ConfigLookup(String),

    /// A required form is absent from the input directory
    #[error("No file containing '{marker}' found in {}", dir.display())]
    MissingDocument {
        /// File name marker that was searched for
        marker: String,
        /// Directory that was searched
        dir: PathBuf,
    },

    /// Document type has no transform chain
    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(String),

    /// Invalid option passed by the caller
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build a [`Error::FieldCoercion`] for `field` holding `value`.
    pub(crate) fn coercion(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::FieldCoercion {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
