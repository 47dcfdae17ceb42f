//! Integration tests for directory mirroring and file transforms.

mod common;

use canada_xfa::compose::{
    default_compose, list_files, process_directory, CopyFile, CopyMode, FileTransform,
    FileTransformCompose, MakeContentCopyProtectedMachineReadable,
};
use canada_xfa::xfa::XfaExtractor;
use canada_xfa::Error;
use std::fs::{self, File, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

// ============================================================================
// Directory mirroring
// ============================================================================

#[test]
fn test_mirrors_nested_directories() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("b.txt"), "b");
    write(&src.path().join("a.csv"), "x,y\n1,2\n");
    write(&src.path().join("nested/deeper/c.txt"), "c");

    let written = process_directory(src.path(), dst.path(), &default_compose(), "*").unwrap();

    assert_eq!(
        written,
        vec![
            dst.path().join("a.csv"),
            dst.path().join("b.txt"),
            dst.path().join("nested/deeper/c.txt"),
        ]
    );
    assert_eq!(fs::read_to_string(dst.path().join("nested/deeper/c.txt")).unwrap(), "c");
    assert_eq!(fs::read_to_string(dst.path().join("a.csv")).unwrap(), "x,y\n1,2\n");
}

#[test]
fn test_unrouted_files_are_skipped() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("notes.md"), "# notes");
    write(&src.path().join("label.txt"), "1");

    let written = process_directory(src.path(), dst.path(), &default_compose(), "*").unwrap();

    assert_eq!(written, vec![dst.path().join("label.txt")]);
    assert!(!dst.path().join("notes.md").exists());
}

#[test]
fn test_pattern_filters_file_names() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("keep_1.txt"), "1");
    write(&src.path().join("drop_1.txt"), "2");
    write(&src.path().join("sub/keep_2.txt"), "3");

    let written = process_directory(src.path(), dst.path(), &default_compose(), "keep_*").unwrap();

    assert_eq!(
        written,
        vec![dst.path().join("keep_1.txt"), dst.path().join("sub/keep_2.txt")]
    );
    assert!(!dst.path().join("drop_1.txt").exists());
}

#[test]
fn test_same_source_and_destination_rejected() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("label.txt"), "1");

    let err = process_directory(dir.path(), dir.path(), &default_compose(), "*").unwrap_err();
    assert!(matches!(err, Error::InvalidOption(_)));
    assert_eq!(list_files(dir.path()).unwrap(), vec![dir.path().join("label.txt")]);
}

#[test]
fn test_missing_source_is_io_error() {
    let dst = TempDir::new().unwrap();
    let src = dst.path().join("does-not-exist");

    let err = process_directory(&src, dst.path().join("out"), &default_compose(), "*").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

// ============================================================================
// Copy modes
// ============================================================================

#[test]
fn test_every_copy_mode_copies_content() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("source.txt");
    write(&src, "payload");

    for mode in ["c", "cf", "c2"] {
        let copy = CopyFile::new(mode.parse::<CopyMode>().unwrap());
        let dst = dir.path().join(format!("copy_{}.txt", mode));
        copy.apply(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "payload", "mode {}", mode);
    }
}

#[test]
fn test_copy2_preserves_modification_time() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("old.txt");
    write(&src, "old");

    let past = SystemTime::now() - Duration::from_secs(30 * 24 * 3600);
    File::options()
        .write(true)
        .open(&src)
        .unwrap()
        .set_times(FileTimes::new().set_accessed(past).set_modified(past))
        .unwrap();

    let dst = dir.path().join("copy.txt");
    CopyFile::new(CopyMode::Copy2).apply(&src, &dst).unwrap();

    let src_mtime = fs::metadata(&src).unwrap().modified().unwrap();
    let dst_mtime = fs::metadata(&dst).unwrap().modified().unwrap();
    assert_eq!(dst_mtime, src_mtime);

    let plain = dir.path().join("plain.txt");
    CopyFile::new(CopyMode::CopyFile).apply(&src, &plain).unwrap();
    assert!(fs::metadata(&plain).unwrap().modified().unwrap() > src_mtime);
}

// ============================================================================
// PDF transform
// ============================================================================

#[test]
fn test_machine_readable_copy_keeps_datasets() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("imm5645e.pdf");
    let dst = dir.path().join("out/imm5645e.pdf");
    common::write_xfa_pdf(&src, common::FAKE_5645E, true);
    fs::create_dir_all(dst.parent().unwrap()).unwrap();

    MakeContentCopyProtectedMachineReadable.apply(&src, &dst).unwrap();

    let original = XfaExtractor::extract_raw_content(&src).unwrap();
    let resaved = XfaExtractor::extract_raw_content(&dst).unwrap();
    assert_eq!(resaved, original);
    assert!(resaved.contains("<IMM_5645>"));
}

#[test]
fn test_machine_readable_rejects_non_pdf() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("fake.pdf");
    write(&src, "plain text");

    let err = MakeContentCopyProtectedMachineReadable
        .apply(&src, &dir.path().join("out.pdf"))
        .unwrap_err();
    assert!(matches!(err, Error::MalformedPdf(_)));
}

#[test]
fn test_custom_compose_routes_by_substring() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("imm5257e.pdf"), "not really a pdf");
    write(&src.path().join("label.txt"), "0");

    let compose = FileTransformCompose::new()
        .with(CopyFile::new(CopyMode::Copy), "5257")
        .with(CopyFile::new(CopyMode::CopyFile), ".txt");
    let written = process_directory(src.path(), dst.path(), &compose, "*").unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(
        fs::read_to_string(dst.path().join("imm5257e.pdf")).unwrap(),
        "not really a pdf"
    );
}
