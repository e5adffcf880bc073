//! Base builder carrying compiled defaults for scalar keys.
//!
//! Later sources replace values key by key; arrays such as `assembly.roles`
//! are replaced whole, never merged element-wise.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")?
        .set_default("fixity.algorithm", "sha256")?
        .set_default("fixity.origin_log", "fixityFromOrigin.txt")?
        .set_default("fixity.staged_log", "fixityOnDisk.txt")?
        .set_default("assembly.object_level", 1_i64)
}
