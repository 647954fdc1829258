//! OTA memory readiness check.

use super::{Outcome, Probe, NO_RESPONSE_HINTS};
use crate::engine::Status;
use crate::error::AppResult;
use crate::interpreter::memory::MEMINFO_NAME;
use crate::interpreter::{evaluate, parse_memory_report, MemoryReport, VerdictStatus};
use crate::port::SerialPortAdapter;
use crate::report::format_bytes;
use serde_json::json;

const UNSUPPORTED_HINTS: &[&str] = &[
    "The firmware was built without the FWMEMINFO command",
    "Rebuild ESP-AT with the custom memory-report command enabled",
    "Flash the rebuilt factory image and rerun this check",
];

const NO_PSRAM_HINTS: &[&str] = &[
    "Enable PSRAM in menuconfig (Component config -> ESP PSRAM)",
    "Check that the module actually carries PSRAM (e.g. a WROVER variant)",
];

const FRAGMENTED_HINTS: &[&str] = &[
    "Reduce PSRAM usage by other components before starting OTA",
    "Reset the module and run the check before other services allocate",
];

/// `AT` then `AT+FWMEMINFO?`, judged against `threshold` bytes of
/// contiguous PSRAM.
pub fn memory_check<P: SerialPortAdapter>(
    mut probe: Probe<'_, P>,
    threshold: u64,
) -> AppResult<Outcome> {
    probe.console().banner("OTA memory check")?;

    probe.console().section("Step 1: basic AT")?;
    let ping = probe.run("AT")?;
    if !ping.is_success() {
        let console = probe.console();
        console.fail(format!("Module did not answer AT ({})", ping.status))?;
        console.hints("Troubleshooting:", NO_RESPONSE_HINTS)?;
        return Ok(probe.finish("memory-check", false, json!({ "stage": "ping" })));
    }
    probe.console().pass("Module responds to AT")?;

    probe.console().section("Step 2: memory report")?;
    let reply = probe.run("AT+FWMEMINFO?")?;

    if !reply.has_data(MEMINFO_NAME) {
        let console = probe.console();
        let stage = match reply.status {
            Status::Failure => {
                console.fail("AT+FWMEMINFO? not recognized by this firmware")?;
                console.hints("Next steps:", UNSUPPORTED_HINTS)?;
                "unsupported"
            }
            Status::Timeout => {
                console.fail("No response to AT+FWMEMINFO?")?;
                "no_response"
            }
            _ => {
                console.fail("Unexpected reply format (no +FWMEMINFO lines)")?;
                "unexpected_format"
            }
        };
        return Ok(probe.finish("memory-check", false, json!({ "stage": stage })));
    }
    if reply.status != Status::Success {
        probe
            .console()
            .warn(format!("Report arrived but the command ended {}", reply.status))?;
    }

    let report = parse_memory_report(&reply.raw);
    let verdict = evaluate(&report, threshold);

    probe.console().section("Analysis")?;
    print_report(&mut probe, &report)?;

    let console = probe.console();
    match verdict.status {
        VerdictStatus::Sufficient => console.pass(format!(
            "Largest PSRAM block is at least {}",
            format_bytes(threshold)
        ))?,
        VerdictStatus::Insufficient => {
            console.fail(format!(
                "Largest PSRAM block is below {}",
                format_bytes(threshold)
            ))?;
            console.hints("Suggestions:", FRAGMENTED_HINTS)?;
        }
        VerdictStatus::NotDetected => {
            console.fail("PSRAM not detected")?;
            console.hints("Suggestions:", NO_PSRAM_HINTS)?;
        }
    }

    let passed = verdict.passed() && reply.is_success();
    console.line("")?;
    console.line(if passed {
        "RESULT: OTA buffering is possible"
    } else {
        "RESULT: OTA buffering is NOT possible"
    })?;

    Ok(probe.finish(
        "memory-check",
        passed,
        json!({ "report": report, "verdict": verdict }),
    ))
}

fn print_report<P: SerialPortAdapter>(probe: &mut Probe<'_, P>, report: &MemoryReport) -> AppResult<()> {
    let console = probe.console();
    console.line("PSRAM:")?;
    console.line(format!("  free:    {}", format_bytes(report.psram_free)))?;
    console.line(format!("  largest: {}", format_bytes(report.psram_largest)))?;
    console.line("Internal RAM:")?;
    console.line(format!("  free:    {}", format_bytes(report.internal_free)))?;
    console.line(format!("  largest: {}", format_bytes(report.internal_largest)))?;
    Ok(())
}
