//! Environment variable source: RELIQUARY__SECTION__KEY

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

/// Add environment variable overlay to builder.
///
/// The double underscore after the prefix keeps `RELIQUARY_LOG*` logging
/// variables out of the configuration tree.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("RELIQUARY")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
