//! File batches
//!
//! A batch is the flat sequence of file descriptors the fixity and assembly
//! pipelines consume. Descriptors are immutable once issued.

pub mod walker;

use crate::error::StorageError;
use crate::types::FileKey;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

pub use walker::{BatchScan, DirectoryBatch, SkippedEntry};

/// One file as issued by a batch source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Canonical path relative to the batch root; the stable key of the file
    pub canonical_path: FileKey,
    /// Absolute location on disk
    pub file_path: PathBuf,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl FileDescriptor {
    pub fn new(
        canonical_path: impl Into<FileKey>,
        file_path: impl Into<PathBuf>,
        size_bytes: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            canonical_path: canonical_path.into(),
            file_path: file_path.into(),
            size_bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Build a descriptor for `path` under `root`, reading size from disk and
    /// guessing the MIME type from the extension.
    pub fn from_path(root: &Path, path: &Path) -> Result<Self, StorageError> {
        let canonical_path = canonical_path(root, path)?;
        let metadata = std::fs::metadata(path)?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            canonical_path,
            file_path: path.to_path_buf(),
            size_bytes: metadata.len(),
            mime_type,
        })
    }

    /// Whether the file still exists and can be opened for reading.
    pub fn is_readable(&self) -> bool {
        std::fs::File::open(&self.file_path).is_ok()
    }

    /// Final segment of the canonical path.
    pub fn file_name(&self) -> &str {
        self.canonical_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.canonical_path)
    }
}

/// Source of file descriptors (directory walk, database query, fixed list).
pub trait Batch {
    fn descriptors(&self) -> Result<Vec<FileDescriptor>, StorageError>;
}

impl Batch for Vec<FileDescriptor> {
    fn descriptors(&self) -> Result<Vec<FileDescriptor>, StorageError> {
        Ok(self.clone())
    }
}

impl Batch for [FileDescriptor] {
    fn descriptors(&self) -> Result<Vec<FileDescriptor>, StorageError> {
        Ok(self.to_vec())
    }
}

/// Derive the canonical key of `path` relative to `root`.
///
/// Segments are joined with `/` and NFC-normalized so the same file yields the
/// same key regardless of platform separator or filesystem normalization.
pub fn canonical_path(root: &Path, path: &Path) -> Result<FileKey, StorageError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        StorageError::InvalidPath(format!(
            "{} is not under root {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    StorageError::InvalidPath(format!(
                        "{} is not valid UTF-8",
                        path.display()
                    ))
                })?;
                segments.push(name.nfc().collect::<String>());
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => {
                return Err(StorageError::InvalidPath(format!(
                    "{} escapes root {}",
                    path.display(),
                    root.display()
                )));
            }
        }
    }

    if segments.is_empty() {
        return Err(StorageError::InvalidPath(format!(
            "{} is the root itself",
            path.display()
        )));
    }
    Ok(segments.join("/"))
}
