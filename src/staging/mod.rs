//! Staging area layout
//!
//! A staging root holds `data/` and `admin/`. Each transfer lives in a folder
//! of the same name under both: copied content in `data/<folder>`, fixity
//! logs and the run log in `admin/<folder>`.

use crate::batch::DirectoryBatch;
use crate::error::{ApiError, StorageError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const DATA_DIR: &str = "data";
pub const ADMIN_DIR: &str = "admin";
/// Per-folder run log
pub const RUN_LOG: &str = "log.txt";
/// Per-folder record of copy runs
pub const COPY_MANIFEST: &str = "copyFromOrigin.txt";

/// One transfer folder, present under both `data/` and `admin/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingFolder {
    pub name: String,
    pub data_dir: PathBuf,
    pub admin_dir: PathBuf,
}

/// Counts from copying an item into a data folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopySummary {
    pub copied: usize,
    /// Already present with the same size
    pub skipped: usize,
    pub bytes: u64,
}

impl StagingFolder {
    pub fn admin_file(&self, name: &str) -> PathBuf {
        self.admin_dir.join(name)
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.admin_file(RUN_LOG)
    }

    /// Batch over everything copied into this folder, keyed relative to it.
    pub fn data_batch(&self) -> Result<DirectoryBatch, StorageError> {
        DirectoryBatch::rooted_at(&self.data_dir)
    }

    /// Copy `item` (a file or directory under `source_root`) into the data
    /// folder, preserving its path relative to `source_root`. Files already
    /// present with the same size are left alone so a run can be resumed.
    pub fn copy_in(&self, source_root: &Path, item: &Path) -> Result<CopySummary, StorageError> {
        let source_root = dunce::canonicalize(source_root)?;
        let item = dunce::canonicalize(item)?;
        if !item.starts_with(&source_root) {
            return Err(StorageError::InvalidPath(format!(
                "{} is not under source root {}",
                item.display(),
                source_root.display()
            )));
        }

        let mut summary = CopySummary::default();
        for entry in WalkDir::new(&item).sort_by_file_name() {
            let entry = entry.map_err(|e| StorageError::IoError(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&source_root)
                .map_err(|_| StorageError::InvalidPath(entry.path().display().to_string()))?;
            let destination = self.data_dir.join(relative);
            let size = entry.metadata().map_err(|e| StorageError::IoError(e.into()))?.len();

            if std::fs::metadata(&destination).map(|m| m.len() == size).unwrap_or(false) {
                debug!(path = %relative.display(), "Already staged, skipping");
                summary.skipped += 1;
                continue;
            }
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &destination)?;
            debug!(path = %relative.display(), bytes = size, "Copied");
            summary.copied += 1;
            summary.bytes += size;
        }

        let mut manifest = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.admin_file(COPY_MANIFEST))?;
        writeln!(
            manifest,
            "{}\t{}\tcopied={}\tskipped={}\tbytes={}",
            chrono::Utc::now().to_rfc3339(),
            item.display(),
            summary.copied,
            summary.skipped,
            summary.bytes
        )?;

        info!(
            folder = %self.name,
            copied = summary.copied,
            skipped = summary.skipped,
            "Copy into staging complete"
        );
        Ok(summary)
    }
}

/// Structural problems found in a staging area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutReport {
    /// Folders present under both roots
    pub folders: Vec<String>,
    pub only_in_data: Vec<String>,
    pub only_in_admin: Vec<String>,
    /// Entries directly under `data/` or `admin/` that are not directories
    pub non_directories: Vec<String>,
    /// Admin folder to the required files it lacks
    pub incomplete_admin: BTreeMap<String, Vec<String>>,
}

impl LayoutReport {
    pub fn is_valid(&self) -> bool {
        self.only_in_data.is_empty()
            && self.only_in_admin.is_empty()
            && self.non_directories.is_empty()
            && self.incomplete_admin.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Open an existing staging root; `data/` and `admin/` must both exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ApiError> {
        let root = root.as_ref();
        for dir in [DATA_DIR, ADMIN_DIR] {
            if !root.join(dir).is_dir() {
                return Err(ApiError::Staging(format!(
                    "{} is not a staging root: missing {}/ directory",
                    root.display(),
                    dir
                )));
            }
        }
        let root = dunce::canonicalize(root).map_err(StorageError::from)?;
        Ok(Self { root })
    }

    /// Create `data/` and `admin/` under `root` if needed, then open it.
    pub fn create(root: impl AsRef<Path>) -> Result<Self, ApiError> {
        let root = root.as_ref();
        for dir in [DATA_DIR, ADMIN_DIR] {
            std::fs::create_dir_all(root.join(dir)).map_err(StorageError::from)?;
        }
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_root(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn admin_root(&self) -> PathBuf {
        self.root.join(ADMIN_DIR)
    }

    /// Paths for `name` without touching the filesystem.
    pub fn folder(&self, name: &str) -> Result<StagingFolder, ApiError> {
        validate_folder_name(name)?;
        Ok(StagingFolder {
            name: name.to_string(),
            data_dir: self.data_root().join(name),
            admin_dir: self.admin_root().join(name),
        })
    }

    /// An existing folder; both halves must be present.
    pub fn open_folder(&self, name: &str) -> Result<StagingFolder, ApiError> {
        let folder = self.folder(name)?;
        for dir in [&folder.data_dir, &folder.admin_dir] {
            if !dir.is_dir() {
                return Err(ApiError::Staging(format!(
                    "Folder '{}' is incomplete: {} does not exist",
                    name,
                    dir.display()
                )));
            }
        }
        Ok(folder)
    }

    /// Create the next free `<prefix><n>` folder pair.
    pub fn allocate_folder(&self, prefix: &str) -> Result<StagingFolder, ApiError> {
        validate_folder_name(prefix)?;
        if prefix.ends_with(|c: char| c.is_ascii_digit()) {
            return Err(ApiError::Staging(format!(
                "Prefix '{}' must not end in a digit",
                prefix
            )));
        }

        let next = self
            .folder_names()?
            .iter()
            .filter_map(|name| name.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|rest| rest.parse::<u64>().ok())
            .max()
            .map_or(1, |n| n + 1);

        let folder = self.folder(&format!("{}{}", prefix, next))?;
        for dir in [&folder.data_dir, &folder.admin_dir] {
            std::fs::create_dir(dir).map_err(StorageError::from)?;
        }
        info!(folder = %folder.name, "Allocated staging folder");
        Ok(folder)
    }

    /// A name ending in a digit resumes that folder; anything else is a
    /// prefix for a newly allocated one.
    pub fn resolve_folder(&self, prefix_or_name: &str) -> Result<StagingFolder, ApiError> {
        if prefix_or_name.ends_with(|c: char| c.is_ascii_digit()) {
            info!(folder = %prefix_or_name, "Resuming staging folder");
            self.open_folder(prefix_or_name)
        } else {
            self.allocate_folder(prefix_or_name)
        }
    }

    /// Directory names under either root.
    pub fn folder_names(&self) -> Result<BTreeSet<String>, ApiError> {
        let (data, _) = list_dir(&self.data_root())?;
        let (admin, _) = list_dir(&self.admin_root())?;
        Ok(data.union(&admin).cloned().collect())
    }

    /// Check that data and admin folders pair up and that each admin folder
    /// holds `required_files`.
    pub fn validate(&self, required_files: &[&str]) -> Result<LayoutReport, ApiError> {
        let (data_dirs, data_files) = list_dir(&self.data_root())?;
        let (admin_dirs, admin_files) = list_dir(&self.admin_root())?;

        let mut report = LayoutReport {
            folders: data_dirs.intersection(&admin_dirs).cloned().collect(),
            only_in_data: data_dirs.difference(&admin_dirs).cloned().collect(),
            only_in_admin: admin_dirs.difference(&data_dirs).cloned().collect(),
            ..Default::default()
        };
        report.non_directories = data_files
            .iter()
            .map(|f| format!("{}/{}", DATA_DIR, f))
            .chain(admin_files.iter().map(|f| format!("{}/{}", ADMIN_DIR, f)))
            .collect();

        for name in &admin_dirs {
            let admin_dir = self.admin_root().join(name);
            let missing: Vec<String> = required_files
                .iter()
                .filter(|file| !admin_dir.join(file).is_file())
                .map(|file| file.to_string())
                .collect();
            if !missing.is_empty() {
                report.incomplete_admin.insert(name.clone(), missing);
            }
        }

        for name in &report.only_in_data {
            warn!(folder = %name, "Directory appears in data but not admin");
        }
        for name in &report.only_in_admin {
            warn!(folder = %name, "Directory appears in admin but not data");
        }
        for entry in &report.non_directories {
            warn!(entry = %entry, "Entry is not a directory");
        }
        Ok(report)
    }
}

fn validate_folder_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ApiError::Staging(format!(
            "Invalid staging folder name {:?}",
            name
        )));
    }
    Ok(())
}

/// Directory names and other entry names directly under `dir`.
fn list_dir(dir: &Path) -> Result<(BTreeSet<String>, BTreeSet<String>), ApiError> {
    let mut dirs = BTreeSet::new();
    let mut others = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(StorageError::from)? {
        let entry = entry.map_err(StorageError::from)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().map_err(StorageError::from)?.is_dir() {
            dirs.insert(name);
        } else {
            others.insert(name);
        }
    }
    Ok((dirs, others))
}
