//! `[fixity]` section.

use crate::error::ApiError;
use crate::fixity::{FixityHasher, HashAlgorithm};
use serde::{Deserialize, Serialize};

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_origin_log() -> String {
    "fixityFromOrigin.txt".to_string()
}

fn default_staged_log() -> String {
    "fixityOnDisk.txt".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixityConfig {
    #[serde(default)]
    pub algorithm: HashAlgorithm,

    /// Hashing threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Origin log file name inside an admin folder
    #[serde(default = "default_origin_log")]
    pub origin_log: String,

    /// Staged log file name inside an admin folder
    #[serde(default = "default_staged_log")]
    pub staged_log: String,
}

impl Default for FixityConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            workers: default_workers(),
            origin_log: default_origin_log(),
            staged_log: default_staged_log(),
        }
    }
}

impl FixityConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.workers == 0 {
            return Err(ApiError::ConfigError(
                "fixity.workers must be at least 1".to_string(),
            ));
        }
        for (name, value) in [("origin_log", &self.origin_log), ("staged_log", &self.staged_log)] {
            if value.is_empty() || value.contains(['/', '\\']) {
                return Err(ApiError::ConfigError(format!(
                    "fixity.{} must be a plain file name, got {:?}",
                    name, value
                )));
            }
        }
        if self.origin_log == self.staged_log {
            return Err(ApiError::ConfigError(
                "fixity.origin_log and fixity.staged_log must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Hasher configured from this section, optionally overriding the algorithm.
    pub fn build_hasher(&self, algorithm: Option<HashAlgorithm>) -> FixityHasher {
        FixityHasher::new(algorithm.unwrap_or(self.algorithm)).workers(self.workers)
    }
}
