use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions,
    BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPQueryString, AMQPScheme, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::transport::Transport;
use crate::config::ConnectionConfig;
use crate::utils::TransportError;

const PERSISTENT_DELIVERY_MODE: u8 = 2;
const REPLY_SUCCESS: u16 = 200;
/// Unacked deliveries the broker may push to one consumer at a time.
const PREFETCH_COUNT: u16 = 256;
/// Upper bound on waiting for the broker to end a cancelled consumer.
const CANCEL_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// [`Transport`] over an AMQP 0-9-1 connection, backed by `lapin`.
///
/// Holds exactly one connection and one channel, both opened by
/// [`AmqpTransport::connect`] and released by [`Transport::close`].
pub struct AmqpTransport {
    connection: Option<Connection>,
    channel: Option<Channel>,
}

impl AmqpTransport {
    /// Opens a connection and a channel, giving up after `connect_timeout`.
    pub async fn connect(
        config: &ConnectionConfig,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let uri = amqp_uri(config);
        let opening = async {
            let connection = Connection::connect_uri(uri, ConnectionProperties::default()).await?;
            let channel = connection.create_channel().await?;
            channel
                .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
                .await?;
            Ok::<_, lapin::Error>((connection, channel))
        };

        let (connection, channel) = timeout(connect_timeout, opening)
            .await
            .map_err(|_| TransportError::ConnectTimeout(connect_timeout))??;

        info!(
            host = %config.host,
            port = config.port,
            vhost = %config.virtual_host,
            "connected to broker"
        );

        Ok(Self {
            connection: Some(connection),
            channel: Some(channel),
        })
    }

    fn channel(&self) -> Result<&Channel, TransportError> {
        self.channel.as_ref().ok_or(TransportError::Closed)
    }
}

impl fmt::Debug for AmqpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpTransport")
            .field("open", &self.is_open())
            .finish()
    }
}

#[async_trait]
impl Transport for AmqpTransport {
    async fn declare_durable_queue(&mut self, queue: &str) -> Result<(), TransportError> {
        let options = QueueDeclareOptions {
            durable: true,
            ..QueueDeclareOptions::default()
        };
        self.channel()?
            .queue_declare(queue, options, FieldTable::default())
            .await?;
        Ok(())
    }

    async fn publish_persistent(&mut self, queue: &str, body: &[u8]) -> Result<(), TransportError> {
        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT_DELIVERY_MODE)
            .with_content_type("application/json".into());

        self.channel()?
            .basic_publish("", queue, BasicPublishOptions::default(), body, properties)
            .await?
            .await?;

        debug!(queue, bytes = body.len(), "published message");
        Ok(())
    }

    async fn consume_for(
        &mut self,
        queue: &str,
        window: Duration,
    ) -> Result<Vec<Vec<u8>>, TransportError> {
        let channel = self.channel()?;
        let consumer_tag = format!("mqcrud-{}", Uuid::new_v4());
        let mut consumer = channel
            .basic_consume(
                queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let collected = collect_until(&mut consumer, Instant::now() + window).await;

        channel
            .basic_cancel(&consumer_tag, BasicCancelOptions::default())
            .await?;

        let mut bodies = collected?;

        // Deliveries buffered before the cancel took effect stay unacked on the
        // channel unless they are taken here. The stream ends once the cancel
        // is confirmed.
        let buffered = collect_until(&mut consumer, Instant::now() + CANCEL_DRAIN_TIMEOUT).await?;
        if !buffered.is_empty() {
            debug!(queue, count = buffered.len(), "collected deliveries buffered at cancel");
        }
        bodies.extend(buffered);
        debug!(queue, count = bodies.len(), "consume window closed");
        Ok(bodies)
    }

    fn is_open(&self) -> bool {
        match (&self.connection, &self.channel) {
            (Some(connection), Some(channel)) => {
                connection.status().connected() && channel.status().connected()
            }
            _ => false,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let channel = self.channel.take();
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };

        if let Some(channel) = channel.filter(|c| c.status().connected()) {
            channel.close(REPLY_SUCCESS, "Bye").await?;
        }
        if connection.status().connected() {
            connection.close(REPLY_SUCCESS, "Bye").await?;
        }

        info!("broker connection closed");
        Ok(())
    }
}

impl Drop for AmqpTransport {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        if !connection.status().connected() {
            return;
        }

        warn!("broker transport dropped without close; closing in background");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = connection.close(REPLY_SUCCESS, "Bye").await;
            });
        }
    }
}

/// Acks and collects deliveries until `deadline` or until the broker ends the
/// consumer, whichever comes first. The consumer stays usable afterwards.
async fn collect_until(
    consumer: &mut Consumer,
    deadline: Instant,
) -> Result<Vec<Vec<u8>>, TransportError> {
    let mut bodies = Vec::new();
    while let Ok(next) = timeout_at(deadline, consumer.next()).await {
        let Some(delivery) = next else {
            break;
        };
        let delivery = delivery?;
        delivery.ack(BasicAckOptions::default()).await?;
        bodies.push(delivery.data);
    }
    Ok(bodies)
}

fn amqp_uri(config: &ConnectionConfig) -> AMQPUri {
    AMQPUri {
        scheme: AMQPScheme::AMQP,
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: config.user.clone(),
                password: config.password.clone(),
            },
            host: config.host.clone(),
            port: config.port,
        },
        vhost: config.virtual_host.clone(),
        query: AMQPQueryString::default(),
    }
}
