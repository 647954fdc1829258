//! Link-level scenarios: passive monitoring, boot detection and line ending
//! discovery.

use super::{Outcome, Probe, NO_RESPONSE_HINTS};
use crate::engine::LineEnding;
use crate::error::AppResult;
use crate::interpreter::lines::{complete_lines, split_lines};
use crate::port::SerialPortAdapter;
use serde_json::json;
use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

/// Pause between the `ready` banner and the first command.
const POST_READY_DELAY: Duration = Duration::from_millis(200);

/// Echo everything the device prints for `window`, without sending anything.
pub fn monitor<P: SerialPortAdapter>(mut probe: Probe<'_, P>, window: Duration) -> AppResult<Outcome> {
    probe
        .console()
        .section(&format!("Monitoring for {:.1}s", window.as_secs_f64()))?;

    let (engine, console) = probe.split();
    let mut write_error: Option<io::Error> = None;
    let mut echo = |chunk: &[u8], _seen: &[u8]| {
        if let Err(e) = console.stream(&String::from_utf8_lossy(chunk)) {
            write_error.get_or_insert(e);
        }
        false
    };
    let seen = engine.listen(window, &mut echo)?;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    let ready = has_ready_line(&seen);
    let console = probe.console();
    console.line("")?;
    if seen.is_empty() {
        console.fail("Nothing received")?;
        console.hints("Troubleshooting:", NO_RESPONSE_HINTS)?;
    } else {
        console.pass(format!("Received {} bytes", seen.len()))?;
    }

    let passed = !seen.is_empty();
    let details = json!({ "bytes": seen.len(), "ready": ready, "text": seen });
    Ok(probe.finish("monitor", passed, details))
}

/// Wait for the `ready` banner (e.g. after pressing reset), then send `AT`.
///
/// A module that booted before the wait started never prints the banner, so
/// `AT` is sent either way and its result decides the outcome.
pub fn wait_ready<P: SerialPortAdapter>(mut probe: Probe<'_, P>, window: Duration) -> AppResult<Outcome> {
    probe.console().section(&format!(
        "Waiting up to {:.1}s for 'ready'",
        window.as_secs_f64()
    ))?;

    let mut stop = |_chunk: &[u8], seen: &[u8]| has_ready_line(&String::from_utf8_lossy(seen));
    let boot_log = probe.engine().listen(window, &mut stop)?;
    for line in split_lines(&boot_log) {
        probe.console().line(format!("<<< {}", line))?;
    }

    let ready = has_ready_line(&boot_log);
    if ready {
        probe.console().pass("Module reported ready")?;
        std::thread::sleep(POST_READY_DELAY);
    } else {
        probe
            .console()
            .warn("No 'ready' banner seen; the module may already be running")?;
    }

    let ping = probe.run("AT")?;
    let passed = ping.is_success();
    let console = probe.console();
    if passed {
        console.pass("Module responds to AT")?;
    } else {
        console.fail(format!("AT returned {}", ping.status))?;
        console.hints("Troubleshooting:", NO_RESPONSE_HINTS)?;
    }

    Ok(probe.finish("wait-ready", passed, json!({ "ready": ready })))
}

/// Try `AT` with every line ending and report which ones the firmware accepts.
pub fn line_endings<P: SerialPortAdapter>(mut probe: Probe<'_, P>) -> AppResult<Outcome> {
    probe.console().banner("Line ending probe")?;

    let mut results = BTreeMap::new();
    let mut recommended = None;
    for ending in LineEnding::ALL {
        probe.console().section(&format!("Terminator {}", ending))?;
        let command = probe.command("AT").with_line_ending(ending);
        let reply = probe.send(&command)?;
        if reply.is_success() && recommended.is_none() {
            recommended = Some(ending);
        }
        results.insert(ending.as_str(), reply.status);
    }

    let console = probe.console();
    console.section("Summary")?;
    for (ending, status) in &results {
        console.line(format!("  {:<5} {}", ending, status))?;
    }
    match recommended {
        Some(ending) => console.pass(format!("Use --line-ending {}", ending.as_str()))?,
        None => {
            console.fail("No line ending produced OK")?;
            console.hints("Troubleshooting:", NO_RESPONSE_HINTS)?;
        }
    }

    let details = json!({
        "results": results,
        "recommended": recommended.map(LineEnding::as_str),
    });
    Ok(probe.finish("line-endings", recommended.is_some(), details))
}

/// Only lines already ended by CR or LF count; `ready` may still grow.
fn has_ready_line(text: &str) -> bool {
    complete_lines(text).any(|line| line.trim() == "ready")
}
