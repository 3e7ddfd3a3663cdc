//! The `utils` module provides the pieces shared by every other module:
//! the error types and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{ClientError, TransportError};
