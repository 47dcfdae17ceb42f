// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::enum_variant_names)]
#![allow(clippy::manual_find)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # Canada XFA
//!
//! Extraction of Canadian visa application forms into flat, typed records.
//!
//! ## Core Features
//!
//! - **XFA Extraction**: pulls the `datasets` packet out of encrypted XFA PDFs
//! - **Form Cleaning**: strips byte-string artifacts and lookup-value subtrees
//! - **Flattening**: nested XML becomes dotted keys (`P1.PD.PrevCOR.Row2.Country`)
//! - **Abbreviation**: long XFA paths shortened through per-form regex tables
//! - **Field Transforms**: declarative rule chains coerce, fill and derive
//!   durations for IMM 5257E and IMM 5645E
//! - **Directory Processing**: uploads are mirrored into a request directory,
//!   PDFs re-saved without content copy protection
//!
//! ## Quick Start
//!
//! ```ignore
//! use canada_xfa::{process, ExtractionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractionConfig::new().with_work_root("/tmp/visa");
//! let bundle = process("upload/", &config)?;
//!
//! println!("{}", bundle.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```
//!
//! Single forms go through [`CanadaPreprocessor`]:
//!
//! ```ignore
//! use canada_xfa::{CanadaPreprocessor, DocType};
//!
//! let mut preprocessor = CanadaPreprocessor::with_bundled_countries()?;
//! let applicant = preprocessor.file_specific_basic_transform(DocType::Canada5257E, "imm5257e.pdf")?;
//! let family = preprocessor.file_specific_basic_transform(DocType::Canada5645E, "imm5645e.pdf")?;
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Record model
pub mod flatten;
pub mod record;

// XFA extraction and cleaning
pub mod xfa;

// Form catalogue and lookups
pub mod countries;
pub mod forms;

// Key/value abbreviation
pub mod summarize;

// Field transform engine
pub mod transform;

// Directory processing
pub mod compose;

// Configuration
pub mod config;

// End-to-end extraction
pub mod preprocess;

// Re-exports
pub use config::ExtractionConfig;
pub use countries::CountryCodes;
pub use error::{Error, Result};
pub use flatten::{flatten, xml_to_flattened, Node};
pub use forms::DocType;
pub use preprocess::{process, read_datasets, read_form, write_record_csv, CanadaPreprocessor, FormBundle};
pub use record::{FlatRecord, Value};
pub use summarize::{summarize, AbbreviationTable};
pub use xfa::XfaExtractor;

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
