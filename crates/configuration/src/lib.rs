use crate::error::ConfigError;
use crate::settings::Settings;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{DatabaseSettings, LogFormat, LoggingSettings};

/// File read when no explicit path is given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix for environment overrides, e.g. `FIELDFORMS__DATABASE__MAX_CONNECTIONS=20`.
pub const ENV_PREFIX: &str = "FIELDFORMS";

/// Loads the application settings.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file
/// (`config.toml` if present, or the explicit `path` which must exist), then
/// `FIELDFORMS__*` environment variables. An empty database URL is filled
/// from `DATABASE_URL`.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut settings = builder.try_deserialize::<Settings>()?;

    if settings.database.url.trim().is_empty() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.database.url = url;
        }
    }

    validate(&settings)?;
    Ok(settings)
}

/// Rejects settings the pool could not honour.
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let db = &settings.database;
    if db.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "database.url (or DATABASE_URL) must be set".to_string(),
        ));
    }
    if db.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections must be at least 1".to_string(),
        ));
    }
    if db.min_connections > db.max_connections {
        return Err(ConfigError::ValidationError(format!(
            "database.min_connections ({}) exceeds max_connections ({})",
            db.min_connections, db.max_connections
        )));
    }
    if db.operation_timeout_secs == 0 || db.acquire_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "database timeouts must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
