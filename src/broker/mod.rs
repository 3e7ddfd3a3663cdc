//! The `broker` module covers everything on the broker side of the client:
//! the message envelope put on the wire, the [`Transport`] trait the client is
//! written against, and its two implementations.

pub mod amqp;
pub mod memory;
pub mod message;
pub mod transport;

pub use amqp::AmqpTransport;
pub use memory::{MemoryBroker, MemoryTransport};
pub use message::{Message, MessageStatus, Payload};
pub use transport::Transport;
