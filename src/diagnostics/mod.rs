//! Synthetic diagnostics.
//!
//! Nothing here reads broker or application logs. [`synthetic_logs`] returns a
//! fixed pair of entries so that callers expecting a log listing have
//! something to render.

use serde::{Deserialize, Serialize};

/// Seconds between the two synthetic entries.
const INITIALISED_AGO_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub level: LogLevel,
    pub message: String,
    pub source: String,
}

/// The fixed log listing, stamped relative to `now` (unix seconds).
pub fn synthetic_logs(now: i64) -> Vec<LogEntry> {
    vec![
        LogEntry {
            timestamp: now,
            level: LogLevel::Info,
            message: "RabbitMQ connection established".to_string(),
            source: "system".to_string(),
        },
        LogEntry {
            timestamp: now - INITIALISED_AGO_SECS,
            level: LogLevel::Info,
            message: "Message queue initialized".to_string(),
            source: "queue_manager".to_string(),
        },
    ]
}
