//! Port-specific error types.
//!
//! Defines error types for serial port operations, separate from application-level
//! errors to maintain clean separation of concerns.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The current user may not open the device node.
    #[error("Permission denied opening serial port: {0}")]
    PermissionDenied(String),

    /// Another process already holds the port.
    #[error("Serial port is busy (claimed by another process): {0}")]
    Busy(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A write did not complete within the port timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Map a failed `serialport` open into the most specific variant.
    pub fn from_open_error(port_name: &str, err: serialport::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            serialport::ErrorKind::NoDevice => Self::not_found(port_name),
            serialport::ErrorKind::InvalidInput => Self::config(err.to_string()),
            serialport::ErrorKind::Io(ErrorKind::NotFound) => Self::not_found(port_name),
            serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
                Self::PermissionDenied(port_name.to_string())
            }
            serialport::ErrorKind::Io(ErrorKind::ResourceBusy) => Self::Busy(port_name.to_string()),
            serialport::ErrorKind::Unknown if err.description.to_lowercase().contains("busy") => {
                Self::Busy(port_name.to_string())
            }
            _ => Self::Serial(err),
        }
    }

    /// True for failures that happen while acquiring the port.
    ///
    /// These are fatal for a diagnostic run: the operator has to fix cabling,
    /// permissions or port ownership before anything else can happen.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::PermissionDenied(_) | Self::Busy(_) | Self::Serial(_)
        )
    }
}
