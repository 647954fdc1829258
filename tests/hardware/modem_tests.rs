//! Tests against a real ESP-AT module.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyUSB0   # or COM3 on Windows
//! export TEST_BAUD=115200         # optional
//! cargo test --features hardware-tests -- --ignored
//! ```

use super::utils::{skip_without_hardware, TimingHelper};
use at_probe::engine::Status;
use at_probe::interpreter::{evaluate, parse_memory_report, MIN_PSRAM_BYTES};
use at_probe::port::{PortError, PortConfiguration, SyncSerialPort};

#[test]
#[ignore] // Run with --ignored flag
fn test_real_module_answers_at() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    let mut engine = config.engine();

    let timer = TimingHelper::new("AT");
    let result = engine.send_text("AT").unwrap();
    timer.finish();

    assert_eq!(result.status, Status::Success, "raw reply: {:?}", result.raw);
}

#[test]
#[ignore]
fn test_real_module_rejects_garbage() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    let mut engine = config.engine();

    let result = engine.send_text("AT+DEFINITELYNOTACOMMAND").unwrap();
    assert_eq!(result.status, Status::Failure);
}

#[test]
#[ignore]
fn test_real_module_memory_report_parses() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    let mut engine = config.engine();

    let result = engine.send_text("AT+FWMEMINFO?").unwrap();
    if result.status != Status::Success {
        println!("Firmware lacks FWMEMINFO ({}), nothing to parse", result.status);
        return;
    }
    let report = parse_memory_report(&result.raw);
    println!("{:?} -> {:?}", report, evaluate(&report, MIN_PSRAM_BYTES).status);
    assert!(report.internal_free > 0);
}

#[test]
#[ignore]
fn test_second_open_is_busy() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    let _first = config.engine();

    let second = SyncSerialPort::open(&config.port_name, PortConfiguration::with_baud(config.baud_rate));
    if cfg!(unix) {
        assert!(matches!(second, Err(PortError::Busy(_))), "{:?}", second.err());
    }
}
