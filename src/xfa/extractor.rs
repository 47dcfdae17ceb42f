//! XFA datasets extraction from PDF documents.
//!
//! XFA forms keep their field values in the `datasets` packet of the `/XFA`
//! array in the AcroForm dictionary:
//!
//! ```text
//! /XFA [ (preamble) 10 0 R (template) 11 0 R (datasets) 12 0 R ... ]
//! ```
//!
//! The packet is an XML stream, usually FlateDecode-compressed.

use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Read;
use std::path::Path;

/// Marker preceding the datasets stream in the `/XFA` array.
pub const DATASETS_PACKET: &[u8] = b"datasets";

const MAX_SEARCH_DEPTH: usize = 32;

/// XFA data extractor.
///
/// Provides static methods to open protected PDFs and pull the XFA datasets
/// packet out of them.
pub struct XfaExtractor;

impl XfaExtractor {
    /// Open a PDF, decrypting it with the empty user password when needed.
    ///
    /// Visa forms are distributed content-copy protected: encrypted with an
    /// empty user password so they open without prompting.
    pub fn open(path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        let mut doc = Document::load(path)
            .map_err(|e| Error::MalformedPdf(format!("{}: {}", path.display(), e)))?;
        if doc.is_encrypted() {
            log::debug!("Decrypting {} with the empty password", path.display());
            doc.decrypt("")
                .map_err(|e| Error::MalformedPdf(format!("{}: cannot decrypt: {}", path.display(), e)))?;
        }
        Ok(doc)
    }

    /// Check if a PDF document carries an `/XFA` entry.
    pub fn has_xfa(doc: &Document) -> bool {
        Self::find_key(doc, b"XFA").is_some()
    }

    /// Extract the datasets XML of the PDF at `path` as text.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use canada_xfa::xfa::XfaExtractor;
    ///
    /// let xml = XfaExtractor::extract_raw_content("imm5257e.pdf")?;
    /// assert!(xml.contains("datasets"));
    /// ```
    pub fn extract_raw_content(path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        log::info!("Extracting XFA datasets from {}", path.display());
        let doc = Self::open(path)?;
        let data = Self::extract_datasets(&doc)?;
        datasets_text(data)
    }

    /// Decoded bytes of the datasets packet.
    pub fn extract_datasets(doc: &Document) -> Result<Vec<u8>> {
        let xfa = Self::find_key(doc, b"XFA")
            .ok_or_else(|| Error::MalformedPdf("No /XFA entry in document".to_string()))?;
        let xfa = Self::resolve(doc, xfa)?;

        let packets = match xfa {
            Object::Array(arr) => arr,
            Object::Stream(_) => {
                return Err(Error::MalformedPdf(
                    "XFA entry is a single stream, expected a packet array".to_string(),
                ))
            },
            _ => return Err(Error::MalformedPdf("XFA entry is not a packet array".to_string())),
        };

        let position = packets
            .iter()
            .position(|o| Self::is_datasets_marker(doc, o))
            .ok_or_else(|| Error::MalformedPdf("XFA array has no datasets packet".to_string()))?;
        let packet = packets.get(position + 1).ok_or_else(|| {
            Error::MalformedPdf("datasets marker is the last XFA array entry".to_string())
        })?;

        match Self::resolve(doc, packet)? {
            Object::Stream(stream) => Self::decode_stream_data(stream),
            _ => Err(Error::MalformedPdf("datasets packet is not a stream".to_string())),
        }
    }

    fn is_datasets_marker(doc: &Document, obj: &Object) -> bool {
        match Self::resolve(doc, obj) {
            Ok(Object::String(s, _)) => s.as_slice() == DATASETS_PACKET,
            Ok(Object::Name(n)) => n.as_slice() == DATASETS_PACKET,
            _ => false,
        }
    }

    /// First value stored under `key` anywhere in the object graph.
    ///
    /// Objects are visited in id order; inline dictionaries, arrays and stream
    /// dictionaries are searched depth first. References are not followed.
    fn find_key<'a>(doc: &'a Document, key: &[u8]) -> Option<&'a Object> {
        doc.objects
            .values()
            .find_map(|obj| Self::search_object(obj, key, 0))
    }

    fn search_object<'a>(obj: &'a Object, key: &[u8], depth: usize) -> Option<&'a Object> {
        if depth > MAX_SEARCH_DEPTH {
            return None;
        }
        match obj {
            Object::Dictionary(dict) => Self::search_dict(dict, key, depth),
            Object::Stream(stream) => Self::search_dict(&stream.dict, key, depth),
            Object::Array(arr) => arr
                .iter()
                .find_map(|item| Self::search_object(item, key, depth + 1)),
            _ => None,
        }
    }

    fn search_dict<'a>(dict: &'a Dictionary, key: &[u8], depth: usize) -> Option<&'a Object> {
        if let Ok(found) = dict.get(key) {
            return Some(found);
        }
        dict.iter()
            .find_map(|(_, value)| Self::search_object(value, key, depth + 1))
    }

    /// Resolve an indirect reference to its object.
    fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
        match obj {
            Object::Reference(id) => doc
                .get_object(*id)
                .map_err(|e| Error::MalformedPdf(format!("object {} {} R: {}", id.0, id.1, e))),
            other => Ok(other),
        }
    }

    /// Decode a stream's data using its filter chain.
    fn decode_stream_data(stream: &Stream) -> Result<Vec<u8>> {
        let filters = Self::get_filters(&stream.dict);
        if filters.is_empty() {
            return Ok(stream.content.clone());
        }
        if filters.iter().all(|f| f.as_slice() == b"FlateDecode") {
            let mut data = stream.content.clone();
            for _ in &filters {
                data = inflate(&data)?;
            }
            return Ok(data);
        }
        stream
            .decompressed_content()
            .map_err(|e| Error::MalformedPdf(format!("cannot decode datasets stream: {}", e)))
    }

    /// Extract filter names from stream dictionary.
    fn get_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
        match dict.get(b"Filter") {
            Ok(Object::Name(n)) => vec![n.clone()],
            Ok(Object::Array(arr)) => arr
                .iter()
                .filter_map(|o| match o {
                    Object::Name(n) => Some(n.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Inflate zlib data, falling back to raw deflate.
///
/// Output recovered before a corruption is returned with a warning.
pub fn inflate(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    match ZlibDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => return Ok(output),
        Err(e) if !output.is_empty() => {
            log::warn!(
                "FlateDecode partial recovery: extracted {} bytes before corruption: {}",
                output.len(),
                e
            );
            return Ok(output);
        },
        Err(e) => log::info!("Zlib decode failed ({}), trying raw deflate", e),
    }

    output.clear();
    match DeflateDecoder::new(input).read_to_end(&mut output) {
        Ok(_) if !output.is_empty() => Ok(output),
        Err(_) if !output.is_empty() => {
            log::warn!("Raw deflate partial recovery: extracted {} bytes", output.len());
            Ok(output)
        },
        _ => Err(Error::MalformedPdf("cannot inflate datasets stream".to_string())),
    }
}

fn datasets_text(data: Vec<u8>) -> Result<String> {
    String::from_utf8(data).map_err(|e| {
        Error::MalformedPdf(format!(
            "XFA datasets packet is not valid UTF-8 (byte {})",
            e.utf8_error().valid_up_to()
        ))
    })
}
