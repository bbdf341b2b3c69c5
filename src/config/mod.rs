//! Configuration loading.
//!
//! Settings come from an optional `config/default.*` file, then from
//! environment variables prefixed with `GATEWAY_` (nested keys separated by
//! `__`, e.g. `GATEWAY_HUB__QUEUE_CAPACITY=64`). Anything left unset falls
//! back to `Settings::default()`.

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BusSettings, HubSettings, LoggingSettings, ServerSettings, Settings};

/// Loads the configuration from the default file and environment variables
/// and merges it over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let settings = Settings::merge(partial);

    settings.validate().map_err(ConfigError::Message)?;
    Ok(settings)
}
