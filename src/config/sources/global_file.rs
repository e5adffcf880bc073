//! Global config file: `$XDG_CONFIG_HOME/reliquary/config.toml`

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    // No HOME means no global file, not a failure
    match xdg::global_config_file() {
        Ok(path) => Ok(builder.add_source(File::from(path).required(false))),
        Err(_) => Ok(builder),
    }
}
