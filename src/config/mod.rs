mod settings;

use std::env;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{ClientSettings, ConnectionConfig, LogSettings, Settings};

/// Environment variables understood for compatibility with existing broker
/// test harnesses, mapped onto their configuration keys.
const LEGACY_ENV_KEYS: [(&str, &str); 5] = [
    ("RABBITMQ_HOST", "connection.host"),
    ("RABBITMQ_PORT", "connection.port"),
    ("RABBITMQ_USER", "connection.user"),
    ("RABBITMQ_PASS", "connection.password"),
    ("RABBITMQ_VHOST", "connection.virtual_host"),
];

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the connection, client and logging configurations
///
/// A `.env` file in the working directory is read first when present.
/// Sources, lowest priority first: `config/default.*`, `MQCRUD_*` variables
/// (`MQCRUD_CONNECTION__HOST`), then the `RABBITMQ_*` variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    let _ = dotenvy::dotenv();

    let mut builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("MQCRUD")
                .prefix_separator("_")
                .separator("__"),
        );

    for (var, key) in LEGACY_ENV_KEYS {
        builder = builder.set_override_option(key, env::var(var).ok())?;
    }

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge_with_defaults(partial))
}

fn merge_with_defaults(partial: PartialSettings) -> Settings {
    let default = Settings::default();
    let connection = partial.connection;
    let client = partial.client;
    let logging = partial.logging;

    Settings {
        connection: ConnectionConfig {
            host: connection
                .as_ref()
                .and_then(|c| c.host.clone())
                .unwrap_or(default.connection.host),
            port: connection
                .as_ref()
                .and_then(|c| c.port)
                .unwrap_or(default.connection.port),
            virtual_host: connection
                .as_ref()
                .and_then(|c| c.virtual_host.clone())
                .unwrap_or(default.connection.virtual_host),
            user: connection
                .as_ref()
                .and_then(|c| c.user.clone())
                .unwrap_or(default.connection.user),
            password: connection
                .as_ref()
                .and_then(|c| c.password.clone())
                .unwrap_or(default.connection.password),
        },
        client: ClientSettings {
            consume_window_ms: client
                .as_ref()
                .and_then(|c| c.consume_window_ms)
                .unwrap_or(default.client.consume_window_ms),
            connect_timeout_ms: client
                .as_ref()
                .and_then(|c| c.connect_timeout_ms)
                .unwrap_or(default.client.connect_timeout_ms),
        },
        logging: LogSettings {
            level: logging
                .and_then(|l| l.level)
                .unwrap_or(default.logging.level),
        },
    }
}
