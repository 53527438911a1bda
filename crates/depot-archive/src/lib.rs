//! Artifact construction for depot.
//!
//! This crate builds the deployable artifact: a zip archive of a project
//! directory whose internal entries are all stored under a prefix named
//! after the directory, so extraction reproduces a single top-level
//! directory instead of dumping files at archive root.
//!
//! # Example
//!
//! ```ignore
//! use depot_archive::{Archiver, ZipArchiver};
//! use std::path::Path;
//!
//! let archiver = ZipArchiver::new();
//! let artifact = archiver.build(Path::new("/work/my-pkg"), Path::new("/tmp/out.zip"))?;
//! // every entry in out.zip starts with "my-pkg/"
//! ```

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

/// Path components never included in an artifact regardless of configuration.
pub const ALWAYS_EXCLUDED: &[&str] = &[".git", ".hg", ".svn"];

/// One entry produced by a [`FileLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the entry
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// File-enumeration collaborator: decides which files belong in an artifact.
pub trait FileLister {
    /// List the entries under `root` in a deterministic order, directories
    /// before their contents.
    fn list(&self, root: &Path) -> Result<Vec<FileEntry>>;
}

/// Default lister: a sorted filesystem walk honoring exclude patterns.
///
/// Patterns match individual path components exactly; an excluded directory
/// is never descended into.
#[derive(Debug, Clone, Default)]
pub struct WalkLister {
    excludes: Vec<String>,
}

impl WalkLister {
    /// Create a lister with no extra excludes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lister with configured exclude patterns.
    pub fn with_excludes(excludes: Vec<String>) -> Self {
        Self { excludes }
    }

    fn is_excluded(&self, name: &str) -> bool {
        ALWAYS_EXCLUDED.contains(&name) || self.excludes.iter().any(|p| p == name)
    }
}

impl FileLister for WalkLister {
    fn list(&self, root: &Path) -> Result<Vec<FileEntry>> {
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(&e.file_name().to_string_lossy()));

        let mut entries = Vec::new();
        for entry in walker {
            let entry =
                entry.with_context(|| format!("failed to walk directory {}", root.display()))?;
            entries.push(FileEntry {
                path: entry.path().to_path_buf(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }
}

/// Failure while building an artifact.
#[derive(Debug)]
pub struct ArchiveError {
    /// Archive file that was being written
    pub target: PathBuf,
    /// Directory that was being archived
    pub source: PathBuf,
    /// Underlying failure
    pub message: String,
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not create archive '{}' from '{}': {}",
            self.target.display(),
            self.source.display(),
            self.message
        )
    }
}

impl std::error::Error for ArchiveError {}

/// Artifact-building capability.
pub trait Archiver {
    /// Archive `source` into the single file `target` and return the
    /// created path. Never mutates `source`.
    fn build(&self, source: &Path, target: &Path) -> Result<PathBuf, ArchiveError>;
}

/// The one concrete [`Archiver`]: Deflate-compressed zip output.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver<L = WalkLister> {
    lister: L,
}

impl ZipArchiver<WalkLister> {
    /// Archiver backed by the default filesystem walk.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: FileLister> ZipArchiver<L> {
    /// Archiver backed by a custom file-enumeration collaborator.
    pub fn with_lister(lister: L) -> Self {
        Self { lister }
    }

    fn write_archive(&self, source: &Path, target: &Path) -> Result<()> {
        let source = source
            .canonicalize()
            .with_context(|| format!("failed to resolve source directory {}", source.display()))?;
        let prefix = archive_prefix(&source)?;

        let entries = self.lister.list(&source)?;

        let file = File::create(target)
            .with_context(|| format!("failed to create archive file {}", target.display()))?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in entries {
            let local_name = local_name(&prefix, &source, &entry.path)?;
            if entry.is_dir {
                zip.add_directory(local_name, options)
                    .context("failed to add directory entry")?;
            } else {
                zip.start_file(local_name, options)
                    .context("failed to start file entry")?;
                let mut content = File::open(&entry.path)
                    .with_context(|| format!("failed to open {}", entry.path.display()))?;
                io::copy(&mut content, &mut zip)
                    .with_context(|| format!("failed to compress {}", entry.path.display()))?;
            }
        }

        zip.finish().context("failed to finalize archive")?;
        Ok(())
    }
}

impl<L: FileLister> Archiver for ZipArchiver<L> {
    fn build(&self, source: &Path, target: &Path) -> Result<PathBuf, ArchiveError> {
        self.write_archive(source, target)
            .map_err(|err| ArchiveError {
                target: target.to_path_buf(),
                source: source.to_path_buf(),
                message: format!("{err:#}"),
            })?;
        Ok(target.to_path_buf())
    }
}

/// Archive-internal prefix: `basename(source) + "/"`.
fn archive_prefix(source: &Path) -> Result<String> {
    let name = source
        .file_name()
        .with_context(|| format!("source directory {} has no base name", source.display()))?;
    Ok(format!("{}/", name.to_string_lossy()))
}

/// Entry name inside the archive: prefix + source-relative path with
/// forward-slash separators.
fn local_name(prefix: &str, source: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(source)
        .with_context(|| format!("entry {} escapes source directory", path.display()))?;
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok(format!("{prefix}{rel}"))
}
