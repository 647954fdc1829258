//! Diagnostic scenarios built from command exchanges.
//!
//! Each scenario drives a [`Probe`], which sends commands through the engine,
//! prints the transcript and keeps every classification for the final
//! [`Outcome`]. Scenarios never decide the process exit code themselves.

mod basic;
mod boot;
mod memory;
mod mqtt;
mod tls;

pub use basic::{list_commands, ping, send};
pub use boot::{line_endings, monitor, wait_ready};
pub use memory::memory_check;
pub use mqtt::{mqtt_probe, mqtt_session};
pub use tls::tls_probe;

use crate::engine::{Classification, Command, CommandEngine};
use crate::error::AppResult;
use crate::port::SerialPortAdapter;
use crate::report::Console;
use serde::Serialize;
use std::time::Duration;

/// What a scenario run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub scenario: &'static str,
    pub passed: bool,
    pub exchanges: Vec<Classification>,
    /// Scenario-specific findings (memory report, capability table, ...).
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// Engine plus console for the duration of one scenario.
#[derive(Debug)]
pub struct Probe<'a, P: SerialPortAdapter> {
    engine: &'a mut CommandEngine<P>,
    console: &'a mut Console,
    exchanges: Vec<Classification>,
}

impl<'a, P: SerialPortAdapter> Probe<'a, P> {
    pub fn new(engine: &'a mut CommandEngine<P>, console: &'a mut Console) -> Self {
        Self {
            engine,
            console,
            exchanges: Vec::new(),
        }
    }

    /// Send `text` with the engine defaults.
    pub fn run(&mut self, text: &str) -> AppResult<Classification> {
        let command = self.engine.command(text);
        self.send(&command)
    }

    /// Send `text` with a longer or shorter response window.
    pub fn run_with_timeout(&mut self, text: &str, timeout: Duration) -> AppResult<Classification> {
        let command = self.engine.command(text).with_timeout(timeout);
        self.send(&command)
    }

    pub fn send(&mut self, command: &Command) -> AppResult<Classification> {
        let result = self.engine.send(command)?;
        self.console.exchange(&result)?;
        self.exchanges.push(result.clone());
        Ok(result)
    }

    /// A command prepared with the engine defaults, not yet sent.
    pub fn command(&self, text: impl Into<String>) -> Command {
        self.engine.command(text)
    }

    pub fn engine(&mut self) -> &mut CommandEngine<P> {
        &mut *self.engine
    }

    pub fn console(&mut self) -> &mut Console {
        &mut *self.console
    }

    /// Engine and console borrowed together, for listen loops that echo live.
    pub fn split(&mut self) -> (&mut CommandEngine<P>, &mut Console) {
        (&mut *self.engine, &mut *self.console)
    }

    pub fn finish(self, scenario: &'static str, passed: bool, details: serde_json::Value) -> Outcome {
        Outcome {
            scenario,
            passed,
            exchanges: self.exchanges,
            details,
        }
    }
}

/// Printed when the module does not answer a plain `AT`.
pub(crate) const NO_RESPONSE_HINTS: &[&str] = &[
    "Check that this is the AT port, not the log/flash port",
    "Check the baud rate (ESP-AT defaults to 115200)",
    "Press the reset button and wait for the 'ready' banner",
    "Try another line ending with `at-probe line-endings`",
];

/// Quote a string argument the way ESP-AT expects.
///
/// `"`, `,` and `\` inside the value are escaped with a backslash.
pub fn at_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | ',' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
