//! File transforms applied while mirroring an input directory.
//!
//! Each file of the source tree is routed to the first [`FileTransform`]
//! whose filter occurs in its file name. PDFs are re-saved without content
//! copy protection; everything else is copied.
//!
//! # Example
//!
//! ```ignore
//! use canada_xfa::compose::{default_compose, process_directory};
//!
//! let written = process_directory("upload/", "work/decrypted", &default_compose(), "*")?;
//! ```

use crate::error::{Error, Result};
use crate::xfa::XfaExtractor;
use regex::Regex;
use std::fmt;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A side-effecting transform from one file to another.
pub trait FileTransform {
    /// Read `src` and write the transformed file to `dst`.
    fn apply(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Short name used in log messages.
    fn name(&self) -> &str;
}

/// How much of a file [`CopyFile`] carries over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Content and permission bits (`c`)
    Copy,
    /// Content only (`cf`)
    CopyFile,
    /// Content, permission bits and access/modification times (`c2`)
    Copy2,
}

impl FromStr for CopyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "c" => Ok(CopyMode::Copy),
            "cf" => Ok(CopyMode::CopyFile),
            "c2" => Ok(CopyMode::Copy2),
            other => Err(Error::InvalidOption(format!(
                "copy mode '{}' (expected c, cf or c2)",
                other
            ))),
        }
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            CopyMode::Copy => "c",
            CopyMode::CopyFile => "cf",
            CopyMode::Copy2 => "c2",
        };
        f.write_str(mode)
    }
}

/// Plain file copy.
#[derive(Debug, Clone, Copy)]
pub struct CopyFile {
    mode: CopyMode,
}

impl CopyFile {
    /// Copy with the given mode.
    pub fn new(mode: CopyMode) -> Self {
        Self { mode }
    }

    /// Mode in use.
    pub fn mode(&self) -> CopyMode {
        self.mode
    }
}

impl FileTransform for CopyFile {
    fn apply(&self, src: &Path, dst: &Path) -> Result<()> {
        match self.mode {
            CopyMode::Copy => {
                fs::copy(src, dst)?;
            },
            CopyMode::CopyFile => {
                let mut reader = File::open(src)?;
                let mut writer = File::create(dst)?;
                io::copy(&mut reader, &mut writer)?;
            },
            CopyMode::Copy2 => {
                fs::copy(src, dst)?;
                let meta = fs::metadata(src)?;
                let times = FileTimes::new()
                    .set_accessed(meta.accessed()?)
                    .set_modified(meta.modified()?);
                File::options().write(true).open(dst)?.set_times(times)?;
            },
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "copy"
    }
}

/// Re-save a PDF decrypted, dropping its content copy protection.
///
/// The forms are encrypted with an empty user password; once decrypted and
/// saved the XFA streams are readable by any PDF parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeContentCopyProtectedMachineReadable;

impl FileTransform for MakeContentCopyProtectedMachineReadable {
    fn apply(&self, src: &Path, dst: &Path) -> Result<()> {
        let mut doc = XfaExtractor::open(src)?;
        doc.save(dst)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "machine-readable"
    }
}

/// Ordered `(transform, filter)` routing table.
#[derive(Default)]
pub struct FileTransformCompose {
    routes: Vec<(Box<dyn FileTransform>, String)>,
}

impl FileTransformCompose {
    /// Create an empty composer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Files whose name contains `filter` go to `transform`
    /// unless an earlier route already matches.
    pub fn with(mut self, transform: impl FileTransform + 'static, filter: impl Into<String>) -> Self {
        self.routes.push((Box::new(transform), filter.into()));
        self
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Transform routed for `file_name`, if any.
    pub fn route(&self, file_name: &str) -> Option<&dyn FileTransform> {
        self.routes
            .iter()
            .find(|(_, filter)| file_name.contains(filter.as_str()))
            .map(|(transform, _)| transform.as_ref())
    }

    /// Apply the routed transform. Returns false when no route matched.
    pub fn apply(&self, src: &Path, dst: &Path) -> Result<bool> {
        let file_name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.route(&file_name) {
            Some(transform) => {
                log::debug!("{} -> {} ({})", src.display(), dst.display(), transform.name());
                transform.apply(src, dst)?;
                Ok(true)
            },
            None => {
                log::debug!("No transform for {}, skipped", src.display());
                Ok(false)
            },
        }
    }
}

impl fmt::Debug for FileTransformCompose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|(t, filter)| (t.name(), filter)))
            .finish()
    }
}

/// Composer used for visa uploads: documents are copied, PDFs made
/// machine readable.
pub fn default_compose() -> FileTransformCompose {
    FileTransformCompose::new()
        .with(CopyFile::new(CopyMode::CopyFile), ".csv")
        .with(CopyFile::new(CopyMode::CopyFile), ".txt")
        .with(MakeContentCopyProtectedMachineReadable, ".pdf")
}

/// Compile a shell glob (`*`, `?`) into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| Error::InvalidOption(format!("file pattern '{}': {}", pattern, e)))
}

/// Mirror `src` into `dst`, transforming every file whose name matches
/// `pattern`.
///
/// Files are visited in sorted order, recursively; the directory structure is
/// recreated under `dst`. Returns the written files.
pub fn process_directory(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    compose: &FileTransformCompose,
    pattern: &str,
) -> Result<Vec<PathBuf>> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    if same_path(src, dst) {
        return Err(Error::InvalidOption(format!(
            "source and destination are the same directory: {}",
            src.display()
        )));
    }
    let matcher = glob_to_regex(pattern)?;

    let files = list_files(src)?;
    log::info!("Processing {} files from {} into {}", files.len(), src.display(), dst.display());

    let mut written = Vec::new();
    for file in files {
        let matches = file
            .file_name()
            .map(|n| matcher.is_match(&n.to_string_lossy()))
            .unwrap_or(false);
        if !matches {
            continue;
        }
        let relative = file.strip_prefix(src).unwrap_or(&file);
        let target = dst.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if compose.apply(&file, &target)? {
            written.push(target);
        }
    }
    Ok(written)
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Every file under `dir`, recursively, in sorted order.
pub fn list_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir.as_ref(), &mut files)?;
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
