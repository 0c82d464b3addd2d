//! The `config` module holds the key/value option store (`Config`), its
//! text forms, named definitions files (`ConfigFile`) and the bus server's
//! process settings.

mod codec;
pub mod file;
pub mod options;
mod settings;
mod store;

use ::config::{Config as SettingsSource, ConfigError, Environment, File};

pub use file::{ConfigFile, SubscriptionEntry};
pub use settings::{
    BusSettings, LoggingSettings, PartialBusSettings, PartialLoggingSettings,
    PartialServerSettings, PartialSettings, ServerSettings, Settings,
};
pub use store::Config;

/// Loads the bus server settings from `config/default` (any format the
/// `config` crate understands) and `GMSEC_`-prefixed environment variables,
/// e.g. `GMSEC_SERVER__PORT=9200`. Missing values take their defaults.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = SettingsSource::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("GMSEC")
                .prefix_separator("_")
                .separator("__"),
        );

    let partial: PartialSettings = builder.build()?.try_deserialize()?;

    Ok(partial.resolve())
}
