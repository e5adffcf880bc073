//! Configuration
//!
//! Layered configuration: compiled defaults, the global file, the workspace
//! file and `RELIQUARY__SECTION__KEY` environment variables, lowest to highest.

pub mod assembly;
pub mod facade;
pub mod fixity;
pub mod merge;
pub mod paths;
pub mod sources;

pub use assembly::{AssemblyConfig, MatcherKind, RoleConfig};
pub use facade::ConfigLoader;
pub use fixity::FixityConfig;
pub use paths::xdg_root as xdg;

use crate::error::ApiError;
use crate::logging::{validate_logging_config, LoggingConfig};
use serde::{Deserialize, Serialize};

/// Name of the per-workspace configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "reliquary.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliquaryConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub fixity: FixityConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
}

impl ReliquaryConfig {
    /// Check every section; any failure is fatal to the run.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_logging_config(&self.logging)?;
        self.fixity.validate()?;
        self.assembly.validate()?;
        Ok(())
    }
}
