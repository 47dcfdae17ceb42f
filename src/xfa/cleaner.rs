//! Form-specific cleanup of raw XFA datasets XML.
//!
//! The datasets packet of the IMM 5257E form arrives with
//! byte-string literal residue (`b'\n`, stray quotes, literal `\n` escapes) and
//! carries a large `LOVFile` subtree of lookup values that is not form data.
//! The IMM 5645E form only carries the byte-string residue.

use crate::error::{Error, Result};
use crate::forms::DocType;
use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use regex::Regex;

lazy_static! {
    /// Byte-string residue: `b'\n`, single quotes, literal `\n` escapes.
    static ref BYTE_STRING_ARTIFACTS: Regex = Regex::new(r"(b'\\n|'|\\n)").unwrap();
    /// XML declaration, quotes and literal `\n` plus the indentation after it.
    static ref SERIALIZATION_ARTIFACTS: Regex =
        Regex::new(r#"(<\?xml[^>]*\?>|'|\\n[ ]*)"#).unwrap();
}

/// Local name of the lookup-values subtree removed from 5257E datasets.
pub const LOV_ELEMENT: &str = "LOVFile";

/// Clean raw datasets XML for `doc_type`.
///
/// Document types without known artifacts are returned unchanged.
pub fn clean_xml(xml: &str, doc_type: DocType) -> Result<String> {
    match doc_type {
        DocType::Canada5257E => {
            let stripped = strip_byte_string_artifacts(xml);
            let without_lov = remove_root_child(&stripped, LOV_ELEMENT)?;
            Ok(SERIALIZATION_ARTIFACTS
                .replace_all(&without_lov, "")
                .into_owned())
        },
        DocType::Canada5645E => Ok(strip_byte_string_artifacts(xml)),
        DocType::Canada | DocType::CanadaLabel => Ok(xml.to_string()),
    }
}

fn strip_byte_string_artifacts(xml: &str) -> String {
    BYTE_STRING_ARTIFACTS.replace_all(xml, "").into_owned()
}

/// Re-serialize `xml` without the direct children of the root whose local
/// name is `local_name`. The XML declaration is dropped.
pub fn remove_root_child(xml: &str, local_name: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    let mut depth = 0usize;
    let mut skipping: Option<usize> = None;
    let mut removed = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::XmlCleaning(format!(
                "XML parse error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Eof => break,
            Event::Decl(_) => continue,
            Event::Start(ref e) => {
                if skipping.is_none() && depth == 1 && e.local_name().as_ref() == local_name.as_bytes()
                {
                    skipping = Some(depth);
                    removed += 1;
                }
                depth += 1;
                if skipping.is_some() {
                    continue;
                }
            },
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if let Some(start) = skipping {
                    if depth == start {
                        skipping = None;
                    }
                    continue;
                }
            },
            Event::Empty(ref e) => {
                if skipping.is_some() {
                    continue;
                }
                if depth == 1 && e.local_name().as_ref() == local_name.as_bytes() {
                    removed += 1;
                    continue;
                }
            },
            _ => {
                if skipping.is_some() {
                    continue;
                }
            },
        }

        writer
            .write_event(event)
            .map_err(|e| Error::XmlCleaning(format!("XML write error: {}", e)))?;
    }

    if removed == 0 {
        log::warn!("No <{}> element under the document root, nothing removed", local_name);
    } else {
        log::debug!("Removed {} <{}> subtree(s)", removed, local_name);
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::XmlCleaning(format!("cleaned XML is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_5257: &str = r#"<?xml version="1.0" encoding="UTF-8"?><xfa:datasets xmlns:xfa="http://www.xfa.org/schema/xfa-data/1.0/"><xfa:data><form1><Page1><PlaceBirthCity>TEHRAN</PlaceBirthCity></Page1></form1></xfa:data><LOVFile><LOV><item>A</item></LOV></LOVFile></xfa:datasets>"#;

    #[test]
    fn test_5257_removes_lov_subtree_and_declaration() {
        let cleaned = clean_xml(RAW_5257, DocType::Canada5257E).unwrap();
        assert!(!cleaned.contains("LOVFile"));
        assert!(!cleaned.contains("<item>"));
        assert!(!cleaned.contains("<?xml"));
        assert!(cleaned.contains("<PlaceBirthCity>TEHRAN</PlaceBirthCity>"));
        assert!(cleaned.starts_with("<xfa:datasets"));
    }

    #[test]
    fn test_5257_strips_byte_string_residue() {
        let raw = r"b'\n<root><a>x</a>\n   <LOVFile/></root>'";
        let cleaned = clean_xml(raw, DocType::Canada5257E).unwrap();
        assert_eq!(cleaned, "<root><a>x</a>   </root>");
    }

    #[test]
    fn test_nested_lov_is_kept() {
        let xml = "<root><data><LOVFile>keep</LOVFile></data></root>";
        let cleaned = remove_root_child(xml, LOV_ELEMENT).unwrap();
        assert!(cleaned.contains("<LOVFile>keep</LOVFile>"));
    }

    #[test]
    fn test_missing_lov_is_tolerated() {
        let xml = "<root><a>1</a></root>";
        assert_eq!(clean_xml(xml, DocType::Canada5257E).unwrap(), xml);
    }

    #[test]
    fn test_5645_only_strips_residue() {
        let raw = r"b'\n<IMM_5645><p>O'HARE</p><LOVFile/></IMM_5645>'";
        let cleaned = clean_xml(raw, DocType::Canada5645E).unwrap();
        assert_eq!(cleaned, "<IMM_5645><p>OHARE</p><LOVFile/></IMM_5645>");
    }

    #[test]
    fn test_unparseable_5257_is_an_error() {
        let err = clean_xml("<root><a></b></root>", DocType::Canada5257E).unwrap_err();
        assert!(matches!(err, Error::XmlCleaning(_)));
    }

    #[test]
    fn test_other_types_untouched() {
        let raw = "b'\\n<x/>'";
        assert_eq!(clean_xml(raw, DocType::CanadaLabel).unwrap(), raw);
    }
}
