//! Directory-backed batch: walks a directory beneath a declared root.

use super::{Batch, FileDescriptor};
use crate::error::StorageError;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walks `directory` and issues one descriptor per regular file, keyed
/// relative to `root`.
#[derive(Debug, Clone)]
pub struct DirectoryBatch {
    root: PathBuf,
    directory: PathBuf,
    filter: Option<Regex>,
}

/// A file the walk found but could not issue a descriptor for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of walking a directory: the issued descriptors plus every entry
/// that was passed over.
#[derive(Debug, Clone, Default)]
pub struct BatchScan {
    pub descriptors: Vec<FileDescriptor>,
    pub skipped: Vec<SkippedEntry>,
}

impl DirectoryBatch {
    /// `directory` must be `root` or lie beneath it.
    pub fn new(root: impl AsRef<Path>, directory: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = dunce::canonicalize(root.as_ref()).map_err(|e| {
            StorageError::InvalidPath(format!("{}: {}", root.as_ref().display(), e))
        })?;
        let directory = dunce::canonicalize(directory.as_ref()).map_err(|e| {
            StorageError::InvalidPath(format!("{}: {}", directory.as_ref().display(), e))
        })?;
        if !directory.starts_with(&root) {
            return Err(StorageError::InvalidPath(format!(
                "{} is not under root {}",
                directory.display(),
                root.display()
            )));
        }
        Ok(Self {
            root,
            directory,
            filter: None,
        })
    }

    /// Batch rooted at the directory it walks.
    pub fn rooted_at(directory: impl AsRef<Path>) -> Result<Self, StorageError> {
        let directory = directory.as_ref();
        Self::new(directory, directory)
    }

    /// Keep only files whose canonical path matches `filter`.
    pub fn with_filter(mut self, filter: Regex) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl DirectoryBatch {
    /// Walk the directory. One bad entry (unreadable subtree, non-UTF-8 name,
    /// file gone before it could be stat'd) is recorded in `skipped` and the
    /// walk carries on.
    pub fn scan(&self) -> BatchScan {
        let walker = WalkDir::new(&self.directory)
            .follow_links(false)
            .sort_by_file_name();

        let mut scan = BatchScan::default();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.directory.clone());
                    scan.skipped.push(SkippedEntry {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let descriptor = match FileDescriptor::from_path(&self.root, entry.path()) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    scan.skipped.push(SkippedEntry {
                        path: entry.path().to_path_buf(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if let Some(filter) = &self.filter {
                if !filter.is_match(&descriptor.canonical_path) {
                    continue;
                }
            }
            scan.descriptors.push(descriptor);
        }

        debug!(
            directory = %self.directory.display(),
            files = scan.descriptors.len(),
            skipped = scan.skipped.len(),
            "Directory batch collected"
        );
        scan
    }
}

impl Batch for DirectoryBatch {
    fn descriptors(&self) -> Result<Vec<FileDescriptor>, StorageError> {
        let scan = self.scan();
        for entry in &scan.skipped {
            warn!(path = %entry.path.display(), reason = %entry.reason, "Skipping file");
        }
        Ok(scan.descriptors)
    }
}
