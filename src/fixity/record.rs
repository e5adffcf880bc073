//! Fixity records and hash algorithm tags

use crate::batch::FileDescriptor;
use crate::types::FileKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// Length of a complete hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Blake3 => blake3::OUT_LEN * 2,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!(
                "Unknown hash algorithm '{}' (expected 'sha256' or 'blake3')",
                other
            )),
        }
    }
}

/// Digest of one file at one point in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixityRecord {
    pub key: FileKey,
    /// Lowercase hex digest
    pub digest: String,
    pub algorithm: HashAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl FixityRecord {
    pub fn new(key: impl Into<FileKey>, digest: impl AsRef<str>, algorithm: HashAlgorithm) -> Self {
        Self {
            key: key.into(),
            digest: digest.as_ref().to_ascii_lowercase(),
            algorithm,
            size: None,
            mime: None,
        }
    }

    /// Record for a freshly hashed descriptor, carrying its size and MIME type.
    pub fn for_descriptor(
        descriptor: &FileDescriptor,
        digest: impl AsRef<str>,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self::new(descriptor.canonical_path.clone(), digest, algorithm)
            .with_size(descriptor.size_bytes)
            .with_mime(descriptor.mime_type.clone())
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        self.mime = if mime.is_empty() { None } else { Some(mime) };
        self
    }

    /// Same key and same digest.
    pub fn same_fixity(&self, other: &FixityRecord) -> bool {
        self.key == other.key && self.digest == other.digest
    }
}
