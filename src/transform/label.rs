//! Visa decision label files.
//!
//! A label file holds a single space-separated column whose first token is
//! the visa result code.

use super::{coerce, Coercion};
use crate::error::Result;
use crate::forms::fill;
use crate::record::{FlatRecord, Value};
use std::path::Path;

/// Key of the visa decision.
pub const VISA_RESULT: &str = "VisaResult";

/// Parse label text into a one-field record.
pub fn transform_text(text: &str) -> Result<FlatRecord> {
    let raw = text
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(|token| Value::Text(token.to_string()))
        .unwrap_or(Value::Int(fill::VISA_RESULT));
    let mut record = FlatRecord::new();
    record.insert(VISA_RESULT.to_string(), coerce(VISA_RESULT, raw, Coercion::ToInt)?);
    Ok(record)
}

/// Read and parse a label file.
pub fn transform(path: impl AsRef<Path>) -> Result<FlatRecord> {
    let text = std::fs::read_to_string(path.as_ref())?;
    transform_text(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_token_is_result() {
        let record = transform_text("1 ignored\n0\n").unwrap();
        assert_eq!(record[VISA_RESULT], Value::Int(1));
    }

    #[test]
    fn test_empty_label_defaults() {
        assert_eq!(transform_text("").unwrap()[VISA_RESULT], Value::Int(0));
        assert_eq!(transform_text("   \n").unwrap()[VISA_RESULT], Value::Int(0));
    }

    #[test]
    fn test_bad_label() {
        assert!(transform_text("accepted").is_err());
    }
}
