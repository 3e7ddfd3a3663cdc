use serde::{Deserialize, Serialize};

use crate::config::ConnectionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Snapshot of a client's connection, computed on demand.
///
/// A connected status echoes the configured host, port and virtual host; a
/// disconnected one carries only an error description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: ConnectionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn connected(config: &ConnectionConfig) -> Self {
        Self {
            status: ConnectionState::Connected,
            host: Some(config.host.clone()),
            port: Some(config.port),
            vhost: Some(config.virtual_host.clone()),
            error: None,
        }
    }

    pub fn disconnected(error: impl Into<String>) -> Self {
        Self {
            status: ConnectionState::Disconnected,
            host: None,
            port: None,
            vhost: None,
            error: Some(error.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionState::Connected
    }
}
