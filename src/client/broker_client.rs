use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::broker::{AmqpTransport, MemoryBroker, MemoryTransport, Message, Payload, Transport};
use crate::client::status::ConnectionStatus;
use crate::config::{ClientSettings, ConnectionConfig};
use crate::diagnostics::{self, LogEntry};
use crate::utils::{ClientError, TransportError};

/// Client for JSON-enveloped messages on durable broker queues.
///
/// Owns one connection/channel pair, opened when the client is built and
/// released by [`BrokerClient::close`]. There is no reconnection: once the
/// connection drops, every operation fails until a new client is built.
///
/// Reads are destructive. [`list_messages`](Self::list_messages) acknowledges
/// everything it receives, and [`update_message`](Self::update_message) and
/// [`delete_message`](Self::delete_message) are built on it, so both empty the
/// queue. Update republishes only the matched message; every other message it
/// drained is gone.
#[derive(Debug)]
pub struct BrokerClient<T: Transport = AmqpTransport> {
    config: ConnectionConfig,
    transport: T,
    consume_window: Duration,
    closed: bool,
}

impl BrokerClient<AmqpTransport> {
    /// Connects to an AMQP broker with the default client settings.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        Self::connect_with(config, &ClientSettings::default()).await
    }

    pub async fn connect_with(
        config: ConnectionConfig,
        settings: &ClientSettings,
    ) -> Result<Self, ClientError> {
        let transport = AmqpTransport::connect(&config, settings.connect_timeout())
            .await
            .map_err(ClientError::Connection)?;
        Ok(Self::from_transport(config, transport).with_consume_window(settings.consume_window()))
    }
}

impl BrokerClient<MemoryTransport> {
    /// Connects to an in-process [`MemoryBroker`].
    pub fn connect_in_memory(
        broker: &MemoryBroker,
        config: ConnectionConfig,
    ) -> Result<Self, ClientError> {
        let transport = MemoryTransport::connect(broker, &config).map_err(ClientError::Connection)?;
        Ok(Self::from_transport(config, transport))
    }
}

impl<T: Transport> BrokerClient<T> {
    /// Wraps an already connected transport.
    pub fn from_transport(config: ConnectionConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            consume_window: ClientSettings::default().consume_window(),
            closed: false,
        }
    }

    /// Sets how long `list_messages` waits for deliveries.
    pub fn with_consume_window(mut self, window: Duration) -> Self {
        self.consume_window = window;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn consume_window(&self) -> Duration {
        self.consume_window
    }

    /// Wraps `data` in a new envelope and publishes it to `queue`.
    ///
    /// The queue is declared durable first and the message is sent with
    /// persistent delivery mode. Returns the envelope that was published.
    pub async fn publish(&mut self, queue: &str, data: Payload) -> Result<Message, ClientError> {
        let message = Message::new(data, Utc::now().timestamp());
        self.send(queue, &message)
            .await
            .map_err(ClientError::Publish)?;
        debug!(queue, id = %message.id, "message created");
        Ok(message)
    }

    /// Drains `queue` for one consume window and returns what arrived, in order.
    ///
    /// Every delivery is acknowledged, so the returned messages are no longer
    /// on the queue. Bodies that are not a message envelope are dropped.
    pub async fn list_messages(&mut self, queue: &str) -> Result<Vec<Message>, ClientError> {
        self.drain(queue).await.map_err(ClientError::Retrieval)
    }

    /// Republishes the first drained message with id `id`, carrying `new_data`.
    ///
    /// Returns `false` when no drained message matched. Either way the queue
    /// was drained; only the updated copy is put back.
    pub async fn update_message(
        &mut self,
        queue: &str,
        id: &str,
        new_data: Payload,
    ) -> Result<bool, ClientError> {
        let messages = self.drain(queue).await.map_err(ClientError::Update)?;
        let Some(found) = messages.into_iter().find(|m| m.id == id) else {
            return Ok(false);
        };

        let updated = found.updated(new_data, Utc::now().timestamp());
        self.send(queue, &updated)
            .await
            .map_err(ClientError::Update)?;
        debug!(queue, id, "message updated");
        Ok(true)
    }

    /// Reports whether a message with id `id` was on `queue`.
    ///
    /// The queue is drained and nothing is put back, matched or not.
    pub async fn delete_message(&mut self, queue: &str, id: &str) -> Result<bool, ClientError> {
        let messages = self.drain(queue).await.map_err(ClientError::Delete)?;
        let found = messages.iter().any(|m| m.id == id);
        debug!(queue, id, found, "message delete");
        Ok(found)
    }

    /// Synthetic log listing; see [`diagnostics::synthetic_logs`].
    pub fn get_logs(&self) -> Vec<LogEntry> {
        diagnostics::synthetic_logs(Utc::now().timestamp())
    }

    pub fn check_connection_status(&self) -> ConnectionStatus {
        if !self.closed && self.transport.is_open() {
            ConnectionStatus::connected(&self.config)
        } else {
            ConnectionStatus::disconnected("Connection is not open")
        }
    }

    /// Closes the connection. Later calls do nothing.
    ///
    /// A failure while closing is logged and otherwise ignored; the client is
    /// unusable afterwards either way.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "error closing broker connection");
        }
        info!(host = %self.config.host, "client closed");
    }

    async fn send(&mut self, queue: &str, message: &Message) -> Result<(), TransportError> {
        ensure_queue_name(queue)?;
        self.transport.declare_durable_queue(queue).await?;
        let body = message.to_bytes()?;
        self.transport.publish_persistent(queue, &body).await
    }

    async fn drain(&mut self, queue: &str) -> Result<Vec<Message>, TransportError> {
        ensure_queue_name(queue)?;
        self.transport.declare_durable_queue(queue).await?;
        let bodies = self
            .transport
            .consume_for(queue, self.consume_window)
            .await?;

        let messages: Vec<Message> = bodies
            .iter()
            .filter_map(|body| match Message::from_slice(body) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(queue, error = %e, "skipping body that is not a message envelope");
                    None
                }
            })
            .collect();

        debug!(queue, count = messages.len(), "messages retrieved");
        Ok(messages)
    }
}

fn ensure_queue_name(queue: &str) -> Result<(), TransportError> {
    if queue.is_empty() {
        return Err(TransportError::InvalidQueueName(queue.to_string()));
    }
    Ok(())
}
