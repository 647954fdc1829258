//! Command engine errors.
//!
//! Timeouts and unrecognised replies are not errors: they come back as a
//! [`Status`](super::Status). Only misuse and transport failures end up here.

use crate::port::PortError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The command could not be sent as given.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The port failed mid-exchange.
    #[error("Transport error: {0}")]
    Transport(#[from] PortError),
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
