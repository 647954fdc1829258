//! Single-exchange scenarios.

use super::{Outcome, Probe, NO_RESPONSE_HINTS};
use crate::engine::Status;
use crate::error::AppResult;
use crate::port::SerialPortAdapter;
use serde_json::json;
use std::time::Duration;

/// `AT` and nothing else: is the firmware listening?
pub fn ping<P: SerialPortAdapter>(mut probe: Probe<'_, P>) -> AppResult<Outcome> {
    let reply = probe.run("AT")?;
    let passed = reply.is_success();

    let console = probe.console();
    if passed {
        console.pass("Module responds to AT")?;
    } else {
        console.fail(format!("AT returned {}", reply.status))?;
        console.hints("Troubleshooting:", NO_RESPONSE_HINTS)?;
    }
    Ok(probe.finish("ping", passed, serde_json::Value::Null))
}

/// Send one operator-supplied command.
pub fn send<P: SerialPortAdapter>(
    mut probe: Probe<'_, P>,
    text: &str,
    timeout: Option<Duration>,
) -> AppResult<Outcome> {
    let reply = match timeout {
        Some(timeout) => probe.run_with_timeout(text, timeout)?,
        None => probe.run(text)?,
    };
    let details = json!({ "lines": reply.lines() });
    Ok(probe.finish("send", reply.is_success(), details))
}

/// `AT+CMD?`: list every command the firmware was built with.
pub fn list_commands<P: SerialPortAdapter>(
    mut probe: Probe<'_, P>,
    timeout: Duration,
) -> AppResult<Outcome> {
    let reply = probe.run_with_timeout("AT+CMD?", timeout)?;

    let names: Vec<String> = reply
        .data_lines("CMD")
        .into_iter()
        .filter_map(|line| line.fields.get(1).cloned())
        .collect();

    let console = probe.console();
    match reply.status {
        Status::Success if !names.is_empty() => {
            console.pass(format!("{} commands supported", names.len()))?;
            for name in &names {
                console.line(format!("  {}", name))?;
            }
        }
        Status::Success => console.warn("AT+CMD? succeeded but listed no commands")?,
        Status::Unknown => console.warn("Reply did not finish; raise --timeout for long lists")?,
        status => console.fail(format!("AT+CMD? returned {}", status))?,
    }

    let passed = reply.is_success() && !names.is_empty();
    Ok(probe.finish("list-commands", passed, json!({ "commands": names })))
}
