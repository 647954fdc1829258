//! TLS socket check: open an `SSL` link to a host and close it again.

use super::{at_quote, Outcome, Probe, NO_RESPONSE_HINTS};
use crate::config::WifiConfig;
use crate::error::AppResult;
use crate::interpreter::lines::split_lines;
use crate::port::SerialPortAdapter;
use serde_json::json;
use std::time::Duration;

/// DNS lookup plus the TLS handshake; the module only answers after both.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

const HANDSHAKE_HINTS: &[&str] = &[
    "Check that the host resolves from the module (AT+CIPDOMAIN)",
    "Check that the port speaks TLS, not plain TCP",
    "Certificate checks need a synced clock (AT+CIPSNTPCFG)",
    "The module must be joined to an access point (pass --ssid)",
];

/// `CIPSTART` refuses a second link but the first one is up.
fn already_connected(raw: &str) -> bool {
    split_lines(raw).any(|line| line.trim() == "ALREADY CONNECTED")
}

/// Optionally join WiFi, then `AT+CIPSTART="SSL",host,port` in single-link mode.
///
/// Passes when the handshake completes; the link is closed straight away.
pub fn tls_probe<P: SerialPortAdapter>(
    mut probe: Probe<'_, P>,
    wifi: &WifiConfig,
    host: &str,
    port: u16,
) -> AppResult<Outcome> {
    probe
        .console()
        .banner(&format!("TLS socket check: {}:{}", host, port))?;

    let ping = probe.run("AT")?;
    if !ping.is_success() {
        probe.console().hints("Troubleshooting:", NO_RESPONSE_HINTS)?;
        return Ok(probe.finish("tls-probe", false, json!({ "stage": "ping" })));
    }

    probe.console().section("TLS support")?;
    let tls_config = probe.run("AT+CIPSSLCCONF=?")?.is_success();
    if !tls_config {
        probe
            .console()
            .warn("AT+CIPSSLCCONF=? failed; the firmware may lack TLS")?;
    }

    if let Some(ssid) = wifi.ssid.as_deref() {
        probe.console().section("WiFi")?;
        probe.run("AT+CWMODE=1")?;
        let password = wifi.password.as_deref().unwrap_or_default();
        let join = probe
            .command(format!("AT+CWJAP={},{}", at_quote(ssid), at_quote(password)))
            .with_timeout(wifi.join_timeout())
            .with_secret(password);
        if !probe.send(&join)?.is_success() {
            probe.console().fail(format!("Could not join '{}'", ssid))?;
            let details = json!({ "stage": "wifi_join", "tls_config": tls_config });
            return Ok(probe.finish("tls-probe", false, details));
        }
    }

    probe.console().section("Handshake")?;
    probe.run("AT+CIPMUX=0")?;
    let start = probe
        .command(format!("AT+CIPSTART=\"SSL\",{},{}", at_quote(host), port))
        .with_timeout(HANDSHAKE_TIMEOUT);
    let reply = probe.send(&start)?;
    let connected = reply.is_success() || already_connected(&reply.raw);

    if connected {
        probe.run("AT+CIPCLOSE")?;
    }

    let console = probe.console();
    console.line("")?;
    if connected {
        console.pass(format!("TLS connection to {}:{} established", host, port))?;
    } else {
        match reply.error_code() {
            Some(code) => console.fail(format!(
                "TLS connection failed ({}, ERR CODE 0x{:08x})",
                reply.status, code
            ))?,
            None => console.fail(format!("TLS connection failed ({})", reply.status))?,
        }
        console.hints("Troubleshooting:", HANDSHAKE_HINTS)?;
    }

    let details = json!({
        "host": host,
        "port": port,
        "tls_config": tls_config,
        "connected": connected,
        "status": reply.status,
        "err_code": reply.error_code(),
    });
    Ok(probe.finish("tls-probe", connected, details))
}
