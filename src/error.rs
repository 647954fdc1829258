use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::port::PortError;
use thiserror::Error;

/// A specialized `Result` type for the CLI layer.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error type.
///
/// Command outcomes (`Failure`, `Timeout`, ...) are never errors; these are
/// the conditions that stop a run before it can produce a verdict.
#[derive(Debug, Error)]
pub enum AppError {
    /// The serial port could not be acquired.
    #[error("Connection error: {0}")]
    Connection(PortError),

    /// The port failed after it was opened.
    #[error("Transport error: {0}")]
    Transport(PortError),

    /// Bad command line, config file or command text.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        if err.is_connection_error() {
            Self::Connection(err)
        } else {
            Self::Transport(err)
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Configuration(message) => Self::Configuration(message),
            EngineError::Transport(port) => Self::Transport(port),
        }
    }
}

impl AppError {
    /// Operator-facing hints printed under the error.
    pub fn troubleshooting(&self) -> &'static [&'static str] {
        match self {
            Self::Connection(PortError::NotFound(_)) => &[
                "Check that the device is connected",
                "Check the port name (try `at-probe list-ports` or ls /dev/ttyUSB*)",
            ],
            Self::Connection(PortError::PermissionDenied(_)) => &[
                "Add your user to the dialout/uucp group, or adjust the device permissions",
            ],
            Self::Connection(_) => &[
                "Make sure no other program (monitor, flasher, another probe) is using the port",
                "Unplug and replug the board if the port stays busy",
            ],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_errors_split_by_phase() {
        let err: AppError = PortError::not_found("/dev/ttyUSB0").into();
        assert!(matches!(err, AppError::Connection(_)));
        assert!(!err.troubleshooting().is_empty());

        let err: AppError = PortError::Io(std::io::Error::other("unplugged")).into();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[test]
    fn test_engine_configuration_error() {
        let err: AppError = EngineError::configuration("command text is empty").into();
        assert_eq!(err.to_string(), "Configuration error: command text is empty");
    }
}
