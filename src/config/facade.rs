//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::ReliquaryConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from files and environment, then validate it.
    pub fn load(workspace_root: &Path) -> Result<ReliquaryConfig, ApiError> {
        let config = MergeService::load(workspace_root)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file (environment still overlays).
    pub fn load_from_file(path: &Path) -> Result<ReliquaryConfig, ApiError> {
        let config = MergeService::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit file when given, layered sources otherwise.
    pub fn resolve(workspace_root: &Path, explicit: Option<&Path>) -> Result<ReliquaryConfig, ApiError> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => Self::load(workspace_root),
        }
    }

    pub fn default() -> ReliquaryConfig {
        ReliquaryConfig::default()
    }
}
