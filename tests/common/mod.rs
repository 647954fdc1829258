//! Shared test utilities for at-probe tests.
//!
//! This module provides common test infrastructure including:
//! - Engines with short timeouts over a scripted mock port
//! - A runner that executes a scenario against a buffered console

#![allow(dead_code)]

use at_probe::engine::{CommandEngine, EngineSettings};
use at_probe::error::AppResult;
use at_probe::port::MockSerialPort;
use at_probe::report::Console;
use at_probe::scenario::{Outcome, Probe};
use std::time::Duration;

/// Response window used by test engines; silence costs this much per command.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(200);

/// Engine over a clone of `port`, so the test keeps a handle for assertions.
pub fn fast_engine(port: &MockSerialPort) -> CommandEngine<MockSerialPort> {
    CommandEngine::with_settings(
        port.clone(),
        EngineSettings {
            timeout: TEST_TIMEOUT,
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        },
    )
}

/// Create a mock port with one reply script per expected command.
///
/// # Example
/// ```ignore
/// let port = scripted_port(&[&[b"OK\r\n"], &[b"ERROR\r\n"]]);
/// ```
pub fn scripted_port(replies: &[&[&[u8]]]) -> MockSerialPort {
    let mut port = MockSerialPort::new("MOCK0");
    for chunks in replies {
        if chunks.is_empty() {
            port.reply_silence();
        } else {
            port.reply(chunks);
        }
    }
    port
}

/// Run `scenario` over `port` and return its outcome plus the transcript.
pub fn run_scenario<F>(port: &MockSerialPort, scenario: F) -> (Outcome, String)
where
    F: FnOnce(Probe<'_, MockSerialPort>) -> AppResult<Outcome>,
{
    let mut engine = fast_engine(port);
    let mut console = Console::buffered();
    let outcome = scenario(Probe::new(&mut engine, &mut console)).expect("scenario should run");
    (outcome, console.captured())
}
