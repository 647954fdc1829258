//! MQTT capability probe and live broker session.

use super::{at_quote, Outcome, Probe, NO_RESPONSE_HINTS};
use crate::config::{MqttConfig, WifiConfig};
use crate::engine::{Classification, Command, Status};
use crate::error::{AppError, AppResult};
use crate::interpreter::lines::{complete_lines, split_lines, DataLine};
use crate::port::SerialPortAdapter;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// Test forms whose success means the MQTT stack is compiled in.
pub const MQTT_TEST_COMMANDS: &[&str] = &[
    "AT+MQTTUSERCFG=?",
    "AT+MQTTCONNCFG=?",
    "AT+MQTTCONN=?",
    "AT+MQTTSUB=?",
    "AT+MQTTPUB=?",
    "AT+MQTTCLEAN=?",
];

/// How long to wait for our own publish to come back on the subscription.
const LOOPBACK_WINDOW: Duration = Duration::from_secs(3);

/// Check which MQTT commands the firmware accepts, plus TLS and WiFi state.
pub fn mqtt_probe<P: SerialPortAdapter>(mut probe: Probe<'_, P>) -> AppResult<Outcome> {
    probe.console().banner("MQTT capability probe")?;

    let ping = probe.run("AT")?;
    if !ping.is_success() {
        probe.console().hints("Troubleshooting:", NO_RESPONSE_HINTS)?;
        return Ok(probe.finish("mqtt-probe", false, serde_json::Value::Null));
    }

    probe.console().section("Firmware")?;
    probe.run("AT+GMR")?;

    probe.console().section("MQTT commands")?;
    let mut supported = BTreeMap::new();
    for &text in MQTT_TEST_COMMANDS {
        let reply = probe.run(text)?;
        supported.insert(text, reply.is_success());
    }

    probe.console().section("TLS and WiFi")?;
    let tls = probe.run("AT+CIPSSLCCONF=?")?.is_success();
    let mode = probe
        .run("AT+CWMODE?")?
        .data_lines("CWMODE")
        .first()
        .and_then(|line| line.u64_field(0));
    let joined_ssid = probe
        .run("AT+CWJAP?")?
        .data_lines("CWJAP")
        .first()
        .and_then(|line| line.fields.first().cloned());

    let missing: Vec<&str> = supported
        .iter()
        .filter(|(_, ok)| !**ok)
        .map(|(text, _)| *text)
        .collect();
    let passed = missing.is_empty();

    let console = probe.console();
    console.line("")?;
    if passed {
        console.pass("All MQTT commands are available")?;
    } else {
        console.fail(format!("Missing MQTT commands: {}", missing.join(", ")))?;
    }
    if !tls {
        console.warn("SSL client configuration unavailable; TLS brokers will not work")?;
    }
    match &joined_ssid {
        Some(ssid) => console.line(format!("WiFi: joined '{}'", ssid))?,
        None => console.line("WiFi: not joined to an access point")?,
    }

    let details = json!({
        "mqtt": supported,
        "tls_config": tls,
        "wifi_mode": mode,
        "joined_ssid": joined_ssid,
    });
    Ok(probe.finish("mqtt-probe", passed, details))
}

#[derive(Debug, Serialize)]
struct Step {
    step: &'static str,
    status: Status,
}

/// Join WiFi, connect to the broker, subscribe, publish and clean up.
///
/// Stops at the first failing step; `AT+MQTTCLEAN` still runs once the
/// client has been configured.
pub fn mqtt_session<P: SerialPortAdapter>(
    mut probe: Probe<'_, P>,
    wifi: &WifiConfig,
    mqtt: &MqttConfig,
) -> AppResult<Outcome> {
    let ssid = wifi.ssid.as_deref().ok_or_else(|| {
        AppError::Configuration(
            "wifi.ssid is required for mqtt-session (or set AT_PROBE_WIFI_SSID)".to_string(),
        )
    })?;
    let wifi_password = wifi.password.as_deref().unwrap_or_default();

    probe.console().banner("MQTT live session")?;
    let mut steps = Vec::new();
    let mut configured = false;

    let mut published = None;
    let passed = 'session: {
        let ping = probe.command("AT");
        if !step(&mut probe, &mut steps, "ping", ping)?.is_success() {
            break 'session false;
        }

        let station = probe.command("AT+CWMODE=1");
        if !step(&mut probe, &mut steps, "station_mode", station)?.is_success() {
            break 'session false;
        }

        let join = probe
            .command(format!(
                "AT+CWJAP={},{}",
                at_quote(ssid),
                at_quote(wifi_password)
            ))
            .with_timeout(wifi.join_timeout())
            .with_secret(wifi_password);
        if !step(&mut probe, &mut steps, "wifi_join", join)?.is_success() {
            probe.console().hints(
                "WiFi join failed:",
                &["Check the SSID and password", "Check the AP is 2.4 GHz and in range"],
            )?;
            break 'session false;
        }
        probe.run("AT+CIPSTA?")?;

        if let Some(server) = &mqtt.sntp_server {
            let sntp = probe.command(format!("AT+CIPSNTPCFG=1,0,{}", at_quote(server)));
            if !step(&mut probe, &mut steps, "sntp_config", sntp)?.is_success() {
                break 'session false;
            }
            probe.run("AT+CIPSNTPTIME?")?;
        }

        let usercfg = probe
            .command(format!(
                "AT+MQTTUSERCFG=0,{},{},{},{},0,0,\"\"",
                mqtt.scheme,
                at_quote(&mqtt.client_id),
                at_quote(&mqtt.username),
                at_quote(&mqtt.password)
            ))
            .with_secret(mqtt.password.as_str());
        if !step(&mut probe, &mut steps, "user_config", usercfg)?.is_success() {
            break 'session false;
        }
        configured = true;

        if let Some(sni) = &mqtt.sni {
            let sni = probe.command(format!("AT+MQTTSNI=0,{}", at_quote(sni)));
            if !step(&mut probe, &mut steps, "sni", sni)?.is_success() {
                break 'session false;
            }
        }

        let connect = probe
            .command(format!(
                "AT+MQTTCONN=0,{},{},0",
                at_quote(&mqtt.host),
                mqtt.port
            ))
            .with_timeout(mqtt.connect_timeout());
        if !step(&mut probe, &mut steps, "connect", connect)?.is_success() {
            probe.console().hints(
                "Broker connection failed:",
                &[
                    "Check the host, port and scheme",
                    "TLS schemes need a synced clock (set mqtt.sntp_server)",
                ],
            )?;
            break 'session false;
        }

        let subscribe = probe.command(format!("AT+MQTTSUB=0,{},0", at_quote(&mqtt.topic)));
        if !step(&mut probe, &mut steps, "subscribe", subscribe)?.is_success() {
            break 'session false;
        }

        let publish = probe.command(format!(
            "AT+MQTTPUB=0,{},{},0,0",
            at_quote(&mqtt.topic),
            at_quote(&mqtt.message)
        ));
        let reply = step(&mut probe, &mut steps, "publish", publish)?;
        if !reply.is_success() {
            break 'session false;
        }
        published = Some(reply);
        true
    };

    let loopback = match &published {
        Some(reply) => wait_for_loopback(&mut probe, reply, &mqtt.topic, &mqtt.message)?,
        None => false,
    };

    if configured {
        let clean = probe.command("AT+MQTTCLEAN=0");
        step(&mut probe, &mut steps, "clean", clean)?;
    }

    let console = probe.console();
    console.line("")?;
    if passed {
        console.pass("MQTT session completed")?;
        if !loopback {
            console.warn("Published message was not received back within the window")?;
        }
    } else {
        console.fail("MQTT session failed")?;
    }

    let details = json!({ "steps": steps, "loopback": loopback });
    Ok(probe.finish("mqtt-session", passed, details))
}

/// Send one named step, print its verdict and record it.
fn step<P: SerialPortAdapter>(
    probe: &mut Probe<'_, P>,
    steps: &mut Vec<Step>,
    name: &'static str,
    command: Command,
) -> AppResult<Classification> {
    probe.console().section(&format!("Step: {}", name))?;
    let reply: Classification = probe.send(&command)?;
    steps.push(Step {
        step: name,
        status: reply.status,
    });
    if !reply.is_success() {
        probe
            .console()
            .fail(format!("{} returned {}", name, reply.status))?;
    }
    Ok(reply)
}

/// True for `+MQTTSUBRECV:<link>,"<topic>",<len>,<payload>` carrying `message` on `topic`.
fn is_loopback(line: &DataLine, topic: &str, message: &str) -> bool {
    line.name == "MQTTSUBRECV"
        && line.fields.get(1).is_some_and(|t| t == topic)
        && line.fields.len() > 3
        && line.fields[3..].join(",") == message
}

/// Find our own message coming back on the subscription.
///
/// The module may push it in the same read as the publish's `OK`, so the
/// publish reply is searched before listening for more.
fn wait_for_loopback<P: SerialPortAdapter>(
    probe: &mut Probe<'_, P>,
    publish: &Classification,
    topic: &str,
    message: &str,
) -> AppResult<bool> {
    if publish
        .data_lines("MQTTSUBRECV")
        .iter()
        .any(|line| is_loopback(line, topic, message))
    {
        return Ok(true);
    }

    probe.console().section("Waiting for loopback")?;
    // An unfinished line at the end of the publish reply continues in the next read.
    let carry = publish
        .raw
        .rfind(['\r', '\n'])
        .map_or(publish.raw.as_str(), |end| &publish.raw[end + 1..])
        .to_string();
    let found = |text: &str| {
        complete_lines(text)
            .filter_map(|line| DataLine::parse(line.trim()))
            .any(|line| is_loopback(&line, topic, message))
    };
    let mut stop = |_chunk: &[u8], seen: &[u8]| {
        found(format!("{}{}", carry, String::from_utf8_lossy(seen)).as_str())
    };
    let seen = probe.engine().listen(LOOPBACK_WINDOW, &mut stop)?;

    for line in split_lines(&seen) {
        probe.console().line(format!("<<< {}", line))?;
    }
    Ok(found(format!("{}{}", carry, seen).as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> DataLine {
        DataLine::parse(text).unwrap()
    }

    #[test]
    fn test_loopback_needs_topic_and_payload_on_one_line() {
        assert!(is_loopback(
            &line(r#"+MQTTSUBRECV:0,"lab/t",5,hello"#),
            "lab/t",
            "hello"
        ));
        assert!(!is_loopback(
            &line(r#"+MQTTSUBRECV:0,"other/t",5,hello"#),
            "lab/t",
            "hello"
        ));
        assert!(!is_loopback(
            &line(r#"+MQTTSUBRECV:0,"lab/t",7,goodbye"#),
            "lab/t",
            "hello"
        ));
        assert!(!is_loopback(&line(r#"+MQTTPUB:0,"lab/t",hello"#), "lab/t", "hello"));
    }

    #[test]
    fn test_loopback_payload_may_contain_commas() {
        assert!(is_loopback(
            &line(r#"+MQTTSUBRECV:0,"lab/t",12,hello, world"#),
            "lab/t",
            "hello, world"
        ));
    }
}
