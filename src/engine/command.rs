//! Outgoing AT command and its line-ending convention.

use super::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Bytes appended to a command line before it goes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\r\n`, what ESP-AT documents.
    #[default]
    CrLf,
    Cr,
    Lf,
    /// `\n\r`; only useful when probing a misbehaving UART bridge.
    LfCr,
}

impl LineEnding {
    /// Every variant, in the order the line-ending probe tries them.
    pub const ALL: [LineEnding; 4] = [Self::CrLf, Self::Cr, Self::Lf, Self::LfCr];

    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::CrLf => b"\r\n",
            Self::Cr => b"\r",
            Self::Lf => b"\n",
            Self::LfCr => b"\n\r",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CrLf => "crlf",
            Self::Cr => "cr",
            Self::Lf => "lf",
            Self::LfCr => "lfcr",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineEnding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crlf" | "\\r\\n" => Ok(Self::CrLf),
            "cr" | "\\r" => Ok(Self::Cr),
            "lf" | "\\n" => Ok(Self::Lf),
            "lfcr" | "\\n\\r" => Ok(Self::LfCr),
            other => Err(format!(
                "unknown line ending '{other}' (expected crlf, cr, lf or lfcr)"
            )),
        }
    }
}

/// One command line plus how long to wait for its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    line_ending: LineEnding,
    timeout: Duration,
    /// Substrings masked wherever the command is logged or reported.
    secrets: Vec<String>,
}

const MASK: &str = "****";

impl Command {
    pub fn new(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            line_ending: LineEnding::default(),
            timeout,
            secrets: Vec::new(),
        }
    }

    /// Mask `secret` in logs, transcripts and the echoed reply.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    /// The command text as it may be displayed.
    pub fn shown(&self) -> String {
        self.mask(&self.text)
    }

    /// Replace every secret occurring in `text`.
    pub fn mask(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reject commands that can never be framed correctly.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.text.trim().is_empty() {
            return Err(EngineError::configuration("command text is empty"));
        }
        if self.text.contains(['\r', '\n']) {
            return Err(EngineError::configuration(format!(
                "command text {:?} contains a line break",
                self.text
            )));
        }
        if !self.text.is_ascii() {
            return Err(EngineError::configuration(format!(
                "command text {:?} is not ASCII",
                self.text
            )));
        }
        if self.timeout.is_zero() {
            return Err(EngineError::configuration("response timeout must be non-zero"));
        }
        Ok(())
    }

    /// The exact bytes written to the port.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let ending = self.line_ending.as_bytes();
        let mut bytes = Vec::with_capacity(self.text.len() + ending.len());
        bytes.extend_from_slice(self.text.as_bytes());
        bytes.extend_from_slice(ending);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(text: &str) -> Command {
        Command::new(text, Duration::from_secs(2))
    }

    #[test]
    fn test_wire_bytes_default_crlf() {
        assert_eq!(cmd("AT").wire_bytes(), b"AT\r\n");
        assert_eq!(
            cmd("AT").with_line_ending(LineEnding::Cr).wire_bytes(),
            b"AT\r"
        );
        assert_eq!(
            cmd("AT").with_line_ending(LineEnding::LfCr).wire_bytes(),
            b"AT\n\r"
        );
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(
            cmd("").validate(),
            Err(EngineError::Configuration(_))
        ));
        assert!(matches!(
            cmd("   ").validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_embedded_newline_and_zero_timeout() {
        assert!(cmd("AT\r\nAT").validate().is_err());
        assert!(Command::new("AT", Duration::ZERO).validate().is_err());
        assert!(cmd("AT+FWMEMINFO?").validate().is_ok());
    }

    #[test]
    fn test_query_and_test_forms_frame_like_any_command() {
        assert_eq!(cmd("AT+CWMODE?").wire_bytes(), b"AT+CWMODE?\r\n".to_vec());
        assert_eq!(cmd("AT+MQTTPUB=?").wire_bytes(), b"AT+MQTTPUB=?\r\n".to_vec());
    }

    #[test]
    fn test_line_ending_parse() {
        assert_eq!("CRLF".parse::<LineEnding>().unwrap(), LineEnding::CrLf);
        assert_eq!("lf".parse::<LineEnding>().unwrap(), LineEnding::Lf);
        assert!("crcr".parse::<LineEnding>().is_err());
    }
}
