//! The `client` module provides [`BrokerClient`], the public face of the crate.
//!
//! A client owns one broker connection and exposes publish, list, update,
//! delete and status operations on top of a [`Transport`](crate::broker::Transport).

pub mod broker_client;
pub mod status;

pub use broker_client::BrokerClient;
pub use status::{ConnectionState, ConnectionStatus};

#[cfg(test)]
mod tests;
