//! AT command request/response engine.
//!
//! One command in flight at a time: reset stale input, write the command line,
//! then poll the port and accumulate until a terminator line or the timeout.
//!
//! ```text
//! scenario ──> CommandEngine::send ──> SerialPortAdapter (write / read_available)
//!                     │
//!                     └──> Classification { Success | Failure | Unknown | Timeout }
//! ```

mod classification;
mod command;
mod error;
mod framing;

pub use classification::{Classification, Status};
pub use command::{Command, LineEnding};
pub use error::EngineError;

use crate::port::SerialPortAdapter;
use framing::TerminatorScan;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Response window used when a command does not carry its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest single wait inside the read loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Defaults applied to commands built with [`CommandEngine::command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub timeout: Duration,
    pub line_ending: LineEnding,
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            line_ending: LineEnding::CrLf,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Owns the connection and runs command exchanges over it.
#[derive(Debug)]
pub struct CommandEngine<P: SerialPortAdapter> {
    port: P,
    settings: EngineSettings,
}

impl<P: SerialPortAdapter> CommandEngine<P> {
    pub fn new(port: P) -> Self {
        Self::with_settings(port, EngineSettings::default())
    }

    pub fn with_settings(port: P, settings: EngineSettings) -> Self {
        Self { port, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// A command using this engine's default timeout and line ending.
    pub fn command(&self, text: impl Into<String>) -> Command {
        Command::new(text, self.settings.timeout).with_line_ending(self.settings.line_ending)
    }

    /// Send `command` and classify whatever comes back.
    ///
    /// # Errors
    ///
    /// - `EngineError::Configuration` if the command is empty or unframeable
    /// - `EngineError::Transport` if the port fails mid-exchange
    pub fn send(&mut self, command: &Command) -> Result<Classification, EngineError> {
        command.validate()?;

        self.port.reset_input_buffer()?;
        self.port.write_bytes(&command.wire_bytes())?;
        let shown = command.shown();
        debug!(port = self.port.name(), command = %shown, "sent");

        let started = Instant::now();
        let mut buffer = Vec::new();
        let mut scan = TerminatorScan::default();
        let mut terminated = None;

        while let Some(remaining) = command.timeout().checked_sub(started.elapsed()) {
            if remaining.is_zero() {
                break;
            }
            let chunk = self
                .port
                .read_available(remaining.min(self.settings.poll_interval))?;
            if chunk.is_empty() {
                continue;
            }
            trace!(bytes = chunk.len(), "chunk");
            buffer.extend_from_slice(&chunk);

            if let Some(status) = scan.feed(&buffer) {
                terminated = Some(status);
                break;
            }
        }

        let elapsed = started.elapsed();
        let status = match terminated {
            Some(status) => status,
            None if buffer.is_empty() => Status::Timeout,
            None => Status::Unknown,
        };

        match status {
            Status::Timeout | Status::Unknown => warn!(
                command = %shown,
                %status,
                bytes = buffer.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "no terminator before timeout"
            ),
            _ => debug!(
                command = %shown,
                %status,
                elapsed_ms = elapsed.as_millis() as u64,
                "classified"
            ),
        }

        Ok(Classification {
            raw: command.mask(&String::from_utf8_lossy(&buffer)),
            command: shown,
            status,
            elapsed,
        })
    }

    /// Build a command with the engine defaults and send it.
    pub fn send_text(&mut self, text: &str) -> Result<Classification, EngineError> {
        let command = self.command(text);
        self.send(&command)
    }

    /// Collect unsolicited output for up to `window`.
    ///
    /// `stop` sees each chunk and everything so far; returning `true` ends early.
    pub fn listen(
        &mut self,
        window: Duration,
        stop: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<String, EngineError> {
        let seen = self
            .port
            .listen(window, self.settings.poll_interval, stop)?;
        Ok(String::from_utf8_lossy(&seen).into_owned())
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Give the connection back, e.g. to close it explicitly.
    pub fn into_inner(self) -> P {
        self.port
    }
}
