//! Read-only access to the gallery root.
//!
//! Clients address files by *logical path*: a slash-separated path relative
//! to the gallery root, exactly as it appears after `/gallery/` in the URL.
//! Every lookup goes through [`SourceStore::resolve`], which is the single
//! place that turns a logical path into a filesystem path.
//!
//! ## Containment
//!
//! A logical path may never name anything outside the root:
//!
//! 1. Lexically, `.` segments are dropped and `..` pops the previous
//!    segment. A `..` with nothing left to pop escapes the root.
//! 2. The surviving path is canonicalized and must still start with the
//!    canonical root, which catches symlinks pointing elsewhere.
//!
//! Either violation is reported as [`SourceError::NotFound`], never as a
//! distinct "forbidden" condition, so probing reveals nothing about the
//! layout outside the root.

use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    fn from_io(logical: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(logical.to_string()),
            _ => Self::Unreadable {
                path: logical.to_string(),
                source: err,
            },
        }
    }
}

/// What a logical path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// A logical path that resolved to an existing entry inside the root.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Normalized logical path (no `.`/`..`, no leading or trailing slash).
    pub logical: String,
    /// Absolute filesystem path.
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// An image file's content, read in full.
#[derive(Debug)]
pub struct ImageAsset {
    /// Absolute filesystem path the bytes were read from.
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read-only accessor over the gallery root directory.
#[derive(Debug, Clone)]
pub struct SourceStore {
    root: PathBuf,
}

impl SourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path to an existing file or directory under the root.
    pub fn resolve(&self, logical: &str) -> Result<Resolved, SourceError> {
        let segments =
            normalize(logical).ok_or_else(|| SourceError::NotFound(logical.to_string()))?;

        let mut path = self.root.clone();
        path.extend(&segments);

        let canonical_root = self
            .root
            .canonicalize()
            .map_err(|e| SourceError::from_io(logical, e))?;
        let canonical = path
            .canonicalize()
            .map_err(|e| SourceError::from_io(logical, e))?;
        if !canonical.starts_with(&canonical_root) {
            return Err(SourceError::NotFound(logical.to_string()));
        }

        let meta = fs::metadata(&canonical).map_err(|e| SourceError::from_io(logical, e))?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else if meta.is_file() {
            EntryKind::File
        } else {
            // Sockets, FIFOs and devices are not gallery content
            return Err(SourceError::NotFound(logical.to_string()));
        };

        Ok(Resolved {
            logical: segments.join("/"),
            path: canonical,
            kind,
        })
    }

    /// Resolve a logical path that must be a regular file.
    pub fn resolve_file(&self, logical: &str) -> Result<Resolved, SourceError> {
        let resolved = self.resolve(logical)?;
        match resolved.kind {
            EntryKind::File => Ok(resolved),
            EntryKind::Directory => Err(SourceError::NotFound(logical.to_string())),
        }
    }

    /// Read a file's full content.
    pub fn read(&self, logical: &str) -> Result<ImageAsset, SourceError> {
        let resolved = self.resolve_file(logical)?;
        let mut bytes = Vec::new();
        File::open(&resolved.path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|e| SourceError::from_io(logical, e))?;
        Ok(ImageAsset {
            path: resolved.path,
            bytes,
        })
    }

    /// Open a file for streaming, returning its metadata alongside.
    pub fn open(&self, logical: &str) -> Result<(File, Metadata), SourceError> {
        let resolved = self.resolve_file(logical)?;
        let file = File::open(&resolved.path).map_err(|e| SourceError::from_io(logical, e))?;
        let meta = file
            .metadata()
            .map_err(|e| SourceError::from_io(logical, e))?;
        Ok((file, meta))
    }

    /// Immediate children of a directory, sorted by name.
    pub fn list(&self, logical: &str) -> Result<Vec<DirEntry>, SourceError> {
        let resolved = self.resolve(logical)?;
        if resolved.kind != EntryKind::Directory {
            return Err(SourceError::NotFound(logical.to_string()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&resolved.path).map_err(|e| SourceError::from_io(logical, e))? {
            let entry = entry.map_err(|e| SourceError::from_io(logical, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| SourceError::from_io(logical, e))?
                .is_dir();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Lexically normalize a logical path into its segments.
///
/// Returns `None` when the path climbs above the root or is absolute in a
/// way that cannot be interpreted relative to it (e.g. a Windows prefix).
fn normalize(logical: &str) -> Option<Vec<String>> {
    let mut segments: Vec<String> = Vec::new();
    for component in Path::new(logical.trim_start_matches('/')).components() {
        match component {
            Component::Normal(s) => segments.push(s.to_str()?.to_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                segments.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(segments)
}
