//! Why a configuration could not be loaded or used.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Flag and variable that can name a config file explicitly.
pub const CONFIG_FLAG: &str = "--config";
pub const CONFIG_ENV: &str = "AT_PROBE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file named by `--config` or `AT_PROBE_CONFIG` is not there.
    ///
    /// Files found by searching the default locations never produce this.
    #[error("config file {} (from {named_by}) does not exist", path.display())]
    Missing {
        path: PathBuf,
        named_by: &'static str,
    },

    #[error("cannot read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {} is not valid: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Only `show-config` renders TOML.
    #[error("cannot render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    /// A loaded value the engine cannot run with, keyed as in the file.
    #[error("{key} {reason}")]
    InvalidValue { key: &'static str, reason: String },

    /// An `AT_PROBE_*` override that does not parse.
    #[error("{var}={value:?}: {reason}")]
    BadEnv {
        var: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing(path: &Path, named_by: &'static str) -> Self {
        Self::Missing {
            path: path.to_path_buf(),
            named_by,
        }
    }

    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }

    pub fn bad_env(var: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::BadEnv {
            var: var.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_names_where_the_path_came_from() {
        let err = ConfigError::missing(Path::new("/tmp/lab.toml"), CONFIG_ENV);
        assert_eq!(
            err.to_string(),
            "config file /tmp/lab.toml (from AT_PROBE_CONFIG) does not exist"
        );
    }

    #[test]
    fn test_bad_env_shows_value() {
        let err = ConfigError::bad_env("AT_PROBE_SERIAL_BAUD", "fast", "expected a baud rate");
        assert_eq!(
            err.to_string(),
            "AT_PROBE_SERIAL_BAUD=\"fast\": expected a baud rate"
        );
    }

    #[test]
    fn test_invalid_value_reads_as_sentence() {
        let err = ConfigError::invalid("serial.baud", "must be non-zero");
        assert_eq!(err.to_string(), "serial.baud must be non-zero");
    }
}
