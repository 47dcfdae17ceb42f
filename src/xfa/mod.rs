//! XFA (XML Forms Architecture) datasets support.
//!
//! Visa forms are XFA forms: the filled-in values live as XML inside the PDF,
//! not in AcroForm fields. This module pulls that XML out, strips the
//! artifacts it carries, and parses it into a [`Node`](crate::flatten::Node)
//! tree.
//!
//! # Example
//!
//! ```ignore
//! use canada_xfa::forms::DocType;
//! use canada_xfa::xfa::{clean_xml, parse_tree, XfaExtractor};
//!
//! let raw = XfaExtractor::extract_raw_content("imm5257e.pdf")?;
//! let xml = clean_xml(&raw, DocType::Canada5257E)?;
//! let tree = parse_tree(&xml)?;
//! ```

mod cleaner;
mod extractor;
mod tree;

pub use cleaner::{clean_xml, remove_root_child, LOV_ELEMENT};
pub use extractor::{inflate, XfaExtractor, DATASETS_PACKET};
pub use tree::{parse_tree, TEXT_KEY};
