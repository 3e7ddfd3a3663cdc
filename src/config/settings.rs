use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration settings for the application.
///
/// Includes the broker connection, client tuning and logging settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub client: ClientSettings,
    pub logging: LogSettings,
}

/// Connection parameters for the broker.
///
/// Immutable once handed to a client; the client owns its copy.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub virtual_host: String,
    pub user: String,
    pub password: String,
}

impl ConnectionConfig {
    pub const DEFAULT_PORT: u16 = 5672;

    pub fn new(
        host: impl Into<String>,
        virtual_host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            virtual_host: virtual_host.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("virtual_host", &self.virtual_host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client tuning that is not part of the connection identity.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// How long `list_messages` keeps its consumer open.
    pub consume_window_ms: u64,
    pub connect_timeout_ms: u64,
}

impl ClientSettings {
    pub fn consume_window(&self) -> Duration {
        Duration::from_millis(self.consume_window_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub connection: Option<PartialConnectionConfig>,
    pub client: Option<PartialClientSettings>,
    pub logging: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub virtual_host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialClientSettings {
    pub consume_window_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new("localhost", "challenge_vhost", "challenge", "challenge123")
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            consume_window_ms: 1000,
            connect_timeout_ms: 5000,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Provides default values for `Settings`.
///
/// Matches the credentials of the local development broker.
impl Default for Settings {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            client: ClientSettings::default(),
            logging: LogSettings::default(),
        }
    }
}
