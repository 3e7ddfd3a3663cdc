//! In-process stand-in for a broker.
//!
//! [`MemoryBroker`] keeps queues in memory and applies the same rules the
//! client relies on from a real broker: messages published to an undeclared
//! queue are dropped, consuming acknowledges (and removes) what it reads, and
//! connections are refused for the wrong credentials or virtual host.
//! [`MemoryTransport`] is the connection handle a client holds.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::broker::transport::Transport;
use crate::config::ConnectionConfig;
use crate::utils::TransportError;

#[derive(Debug, Default)]
struct BrokerState {
    offline: bool,
    /// Bumped on every shutdown so connections opened earlier stay dead.
    epoch: u64,
    credentials: Option<(String, String)>,
    virtual_host: Option<String>,
    queues: HashMap<String, VecDeque<Vec<u8>>>,
}

/// Shared handle to an in-memory broker. Clones refer to the same broker.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    /// A broker that accepts any credentials on any virtual host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept logins with this user and password.
    pub fn with_credentials(self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.lock().credentials = Some((user.into(), password.into()));
        self
    }

    /// Only accept connections to this virtual host.
    pub fn with_virtual_host(self, vhost: impl Into<String>) -> Self {
        self.lock().virtual_host = Some(vhost.into());
        self
    }

    /// Stops accepting connections and severs the existing ones.
    pub fn shut_down(&self) {
        let mut state = self.lock();
        state.offline = true;
        state.epoch += 1;
    }

    pub fn start(&self) {
        self.lock().offline = false;
    }

    /// Number of messages waiting in `queue`, or `None` if it was never declared.
    pub fn queue_len(&self, queue: &str) -> Option<usize> {
        self.lock().queues.get(queue).map(VecDeque::len)
    }

    /// Places a raw body on a declared queue, bypassing any client.
    pub fn push_raw(&self, queue: &str, body: impl Into<Vec<u8>>) {
        if let Some(messages) = self.lock().queues.get_mut(queue) {
            messages.push_back(body.into());
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`Transport`] connected to a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryTransport {
    broker: MemoryBroker,
    epoch: u64,
    closed: bool,
}

impl MemoryTransport {
    pub fn connect(broker: &MemoryBroker, config: &ConnectionConfig) -> Result<Self, TransportError> {
        let state = broker.lock();

        if state.offline {
            return Err(TransportError::Unreachable {
                host: config.host.clone(),
                port: config.port,
            });
        }
        if let Some((user, password)) = &state.credentials {
            if *user != config.user || *password != config.password {
                return Err(TransportError::AccessRefused(
                    "login refused using authentication mechanism PLAIN".to_string(),
                ));
            }
        }
        if let Some(vhost) = &state.virtual_host {
            if *vhost != config.virtual_host {
                return Err(TransportError::AccessRefused(format!(
                    "vhost {} not found",
                    config.virtual_host
                )));
            }
        }

        Ok(Self {
            broker: broker.clone(),
            epoch: state.epoch,
            closed: false,
        })
    }

    fn open_state(&self) -> Result<MutexGuard<'_, BrokerState>, TransportError> {
        let state = self.broker.lock();
        if self.closed || state.offline || state.epoch != self.epoch {
            return Err(TransportError::Closed);
        }
        Ok(state)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn declare_durable_queue(&mut self, queue: &str) -> Result<(), TransportError> {
        if queue.is_empty() {
            return Err(TransportError::InvalidQueueName(queue.to_string()));
        }
        self.open_state()?
            .queues
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn publish_persistent(&mut self, queue: &str, body: &[u8]) -> Result<(), TransportError> {
        let mut state = self.open_state()?;
        // The default exchange drops messages routed to a queue that does not exist.
        match state.queues.get_mut(queue) {
            Some(messages) => messages.push_back(body.to_vec()),
            None => debug!(queue, "unroutable message dropped"),
        }
        Ok(())
    }

    async fn consume_for(
        &mut self,
        queue: &str,
        window: Duration,
    ) -> Result<Vec<Vec<u8>>, TransportError> {
        let declared = self.open_state()?.queues.contains_key(queue);
        if !declared {
            return Err(TransportError::QueueNotFound(queue.to_string()));
        }

        tokio::time::sleep(window).await;

        let mut state = self.open_state()?;
        let bodies = state
            .queues
            .get_mut(queue)
            .map(|messages| messages.drain(..).collect())
            .unwrap_or_default();
        Ok(bodies)
    }

    fn is_open(&self) -> bool {
        self.open_state().is_ok()
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}
