//! The `error` module defines the error types used within `mqcrud`.
//!
//! Failures are reported in two layers. [`TransportError`] describes what went
//! wrong while talking to the broker. [`ClientError`] names the client operation
//! that failed and keeps the transport error as its source, so callers can match
//! on the operation and still reach the original cause.

use std::time::Duration;

use thiserror::Error;

/// Failure raised by a [`Transport`](crate::broker::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Amqp(#[from] lapin::Error),

    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("broker unreachable at {host}:{port}")]
    Unreachable { host: String, port: u16 },

    #[error("invalid queue name: {0:?}")]
    InvalidQueueName(String),

    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("access refused: {0}")]
    AccessRefused(String),

    #[error("connection is closed")]
    Closed,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure raised by a [`BrokerClient`](crate::client::BrokerClient) operation.
///
/// Each variant corresponds to one operation boundary and wraps the transport
/// error that caused it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("RabbitMQ connection failed")]
    Connection(#[source] TransportError),

    #[error("Message creation failed")]
    Publish(#[source] TransportError),

    #[error("Message retrieval failed")]
    Retrieval(#[source] TransportError),

    #[error("Message update failed")]
    Update(#[source] TransportError),

    #[error("Message deletion failed")]
    Delete(#[source] TransportError),
}

impl ClientError {
    /// The transport failure underneath this error.
    pub fn cause(&self) -> &TransportError {
        match self {
            Self::Connection(e)
            | Self::Publish(e)
            | Self::Retrieval(e)
            | Self::Update(e)
            | Self::Delete(e) => e,
        }
    }
}
