//! The outcome of one command exchange.

use crate::interpreter::{self, DataLine, ReplyLine};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How a reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// An `OK` line arrived before any `ERROR` line.
    Success,
    /// An `ERROR` line arrived first.
    Failure,
    /// Bytes arrived but no terminator line before the timeout.
    Unknown,
    /// Nothing arrived at all.
    Timeout,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unknown => "UNKNOWN",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified reply.
///
/// Equality covers the command, status and raw text; `elapsed` is timing
/// metadata and differs between otherwise identical exchanges.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub command: String,
    pub status: Status,
    /// Everything received, decoded lossily.
    pub raw: String,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl PartialEq for Classification {
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command && self.status == other.status && self.raw == other.raw
    }
}

impl Eq for Classification {}

impl Classification {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Reply lines, with the command echo recognised.
    pub fn lines(&self) -> Vec<ReplyLine> {
        interpreter::parse_lines(&self.raw, Some(&self.command))
    }

    /// `+NAME:` data lines in the reply.
    pub fn data_lines(&self, name: &str) -> Vec<DataLine> {
        interpreter::data_lines(&self.raw, name)
    }

    /// True if at least one `+NAME:` line came back.
    pub fn has_data(&self, name: &str) -> bool {
        !self.data_lines(name).is_empty()
    }

    /// The ESP-AT `ERR CODE` printed with a failure, if any.
    pub fn error_code(&self) -> Option<u32> {
        interpreter::error_code(&self.raw)
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(raw: &str, status: Status, elapsed_ms: u64) -> Classification {
        Classification {
            command: "AT+GMR".into(),
            status,
            raw: raw.into(),
            elapsed: Duration::from_millis(elapsed_ms),
        }
    }

    #[test]
    fn test_equality_ignores_elapsed() {
        let a = classification("OK\r\n", Status::Success, 12);
        let b = classification("OK\r\n", Status::Success, 340);
        assert_eq!(a, b);
        assert_ne!(a, classification("OK\r\n", Status::Unknown, 12));
    }

    #[test]
    fn test_echo_is_recognised() {
        let c = classification("AT+GMR\r\nAT version:4.0\r\nOK\r\n", Status::Success, 5);
        assert_eq!(c.lines()[0], ReplyLine::Echo("AT+GMR".into()));
    }

    #[test]
    fn test_serializes_elapsed_as_millis() {
        let c = classification("OK\r\n", Status::Success, 42);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["elapsed_ms"], 42);
        assert_eq!(json["status"], "success");
    }
}
