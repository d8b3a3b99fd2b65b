mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    LogSettings, OverflowPolicy, PartialSettings, RelaySettings, ServerSettings, Settings,
    StorageSettings,
};

/// Prefix for environment overrides, e.g. `CHATRELAY__SERVER__PORT=4000`.
pub const ENV_PREFIX: &str = "CHATRELAY";

/// Loads the configuration from `config/default` (any format the `config`
/// crate understands, optional) and `CHATRELAY__*` environment variables,
/// then fills whatever is still missing from the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}
