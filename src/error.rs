//! Error types
//!
//! Run-fatal failures surface as [`ApiError`]. Per-file and per-object problems
//! ([`HashError`], [`AssemblyError`]) are collected next to successful results so
//! one bad file never aborts a batch.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing fixity logs and staging directories.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Malformed line {line_number} in fixity log {path:?}: {line:?}")]
    MalformedLogLine {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    #[error("Key {key:?} cannot be written to a fixity log (contains a tab or line break)")]
    UnencodableKey { key: String },
}

/// Per-file failure while hashing a batch. Recorded, never fatal.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("{key}: file not found at {path:?}")]
    FileNotFound { key: String, path: PathBuf },

    #[error("{key}: failed to read {path:?}: {source}")]
    Unreadable {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Key of the file the error belongs to.
    pub fn key(&self) -> &str {
        match self {
            HashError::FileNotFound { key, .. } | HashError::Unreadable { key, .. } => key,
        }
    }
}

/// Per-file or per-object failure during object assembly. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyError {
    #[error("{path}: has {segments} path segment(s), fewer than object level {level}")]
    MalformedPath {
        path: String,
        level: usize,
        segments: usize,
    },

    #[error("{identifier}: missing required role '{role}'")]
    MissingRole { identifier: String, role: String },

    #[error("{identifier}: role '{role}' is ambiguous, {} files match: {}", .matches.len(), .matches.join(", "))]
    AmbiguousRole {
        identifier: String,
        role: String,
        matches: Vec<String>,
    },

    #[error("{path}: invalid page index {raw:?} for role '{role}'")]
    InvalidIndex {
        role: String,
        path: String,
        raw: String,
    },

    #[error("role '{role}': page index {index} claimed by {}", .paths.join(", "))]
    DuplicateIndex {
        role: String,
        index: u64,
        paths: Vec<String>,
    },

    #[error("{path}: no page index found for role '{role}'")]
    MissingIndex { role: String, path: String },
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid object level {0}: must be a positive integer")]
    InvalidObjectLevel(i64),

    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Staging area error: {0}")]
    Staging(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Config load error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
