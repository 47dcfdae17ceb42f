//! Synthetic visa forms shared by the integration tests.
//!
//! The PDFs carry only what the extractor looks at: a catalog with an
//! AcroForm whose `/XFA` array holds a template and a datasets packet.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// IMM 5257E datasets: filled, empty and malformed fields, two previous
/// residences, one occupation row, plus the lookup-value subtree.
pub const FAKE_5257E: &str = include_str!("../fixtures/imm5257e_datasets.xml");

/// IMM 5645E datasets: an unsigned form with one real and one empty child,
/// one real and one empty sibling.
pub const FAKE_5645E: &str = include_str!("../fixtures/imm5645e_datasets.xml");

/// Build a one-page PDF whose AcroForm carries `datasets` as its XFA
/// datasets packet.
pub fn xfa_pdf(datasets: &str, compress: bool) -> Document {
    xfa_pdf_bytes(datasets.as_bytes(), compress)
}

/// Same as [`xfa_pdf`] with a raw datasets payload.
pub fn xfa_pdf_bytes(datasets: &[u8], compress: bool) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id: ObjectId = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let template_id = doc.add_object(Stream::new(
        dictionary! {},
        b"<template xmlns=\"http://www.xfa.org/schema/xfa-template/3.3/\"/>".to_vec(),
    ));
    let mut packet = Stream::new(dictionary! {}, datasets.to_vec());
    if compress {
        packet.compress().expect("failed to compress datasets packet");
    }
    let datasets_id = doc.add_object(packet);

    let acroform_id = doc.add_object(dictionary! {
        "Fields" => Object::Array(vec![]),
        "XFA" => Object::Array(vec![
            Object::string_literal("template"),
            Object::Reference(template_id),
            Object::string_literal("datasets"),
            Object::Reference(datasets_id),
        ]),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => Object::Reference(acroform_id),
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Save a synthetic XFA PDF to `path`.
pub fn write_xfa_pdf(path: &Path, datasets: &str, compress: bool) {
    let mut doc = xfa_pdf(datasets, compress);
    doc.save(path).expect("failed to save synthetic XFA PDF");
}

/// Populate `dir` with both forms and a label file.
pub fn write_application(dir: &Path) {
    write_xfa_pdf(&dir.join("imm5257e.pdf"), FAKE_5257E, true);
    write_xfa_pdf(&dir.join("imm5645e.pdf"), FAKE_5645E, false);
    std::fs::write(dir.join("label.txt"), "1\n").expect("failed to write label");
}
