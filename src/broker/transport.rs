use std::time::Duration;

use async_trait::async_trait;

use crate::utils::TransportError;

/// The broker operations the client is built on.
///
/// A transport owns one connection and one channel. Implementations are not
/// expected to be shared: every method takes `&mut self`, so callers must
/// serialize access to a single transport.
#[async_trait]
pub trait Transport: Send {
    /// Declares `queue` as durable. Declaring an existing queue is a no-op.
    async fn declare_durable_queue(&mut self, queue: &str) -> Result<(), TransportError>;

    /// Publishes `body` to the default exchange with `queue` as routing key and
    /// persistent delivery mode.
    async fn publish_persistent(&mut self, queue: &str, body: &[u8]) -> Result<(), TransportError>;

    /// Consumes from `queue` until `window` elapses, acknowledging every
    /// delivery as it arrives. Returns the bodies in arrival order.
    async fn consume_for(
        &mut self,
        queue: &str,
        window: Duration,
    ) -> Result<Vec<Vec<u8>>, TransportError>;

    fn is_open(&self) -> bool;

    /// Closes the channel and connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}
