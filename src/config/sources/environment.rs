//! Environment variable source: DEDUP__* with __ separating nested keys.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("DEDUP")
            .separator("__")
            .try_parsing(true),
    ))
}
