//! # mqcrud
//!
//! `mqcrud` is a thin client for keeping JSON messages on durable AMQP queues
//! (RabbitMQ). It publishes caller data wrapped in an envelope, reads queues
//! back, and offers update and delete operations built on top of reads.
//!
//! Reads are destructive: listing a queue acknowledges and removes everything
//! it returns, and update/delete list the queue first. See
//! [`client::BrokerClient`] for the exact behaviour.
//!
//! ## Core Modules
//!
//! - `broker`: The message envelope, the `Transport` trait, and its AMQP and in-memory implementations.
//! - `client`: `BrokerClient`, which owns one connection and exposes the queue operations.
//! - `config`: Handles loading connection and client configuration from files and the environment.
//! - `diagnostics`: A synthetic log listing.
//! - `utils`: Contains shared utilities, such as error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod utils;

pub use crate::broker::{Message, MessageStatus, Payload};
pub use crate::client::{BrokerClient, ConnectionStatus};
pub use crate::config::{ConnectionConfig, Settings, load_config};
pub use crate::utils::{ClientError, TransportError};
