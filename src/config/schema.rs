//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::engine::{EngineSettings, LineEnding};
use crate::interpreter::MIN_PSRAM_BYTES;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial link settings
    pub serial: SerialConfig,
    /// OTA memory policy
    pub memory: MemoryConfig,
    /// WiFi credentials for live scenarios
    pub wifi: WifiConfig,
    /// Broker settings for the MQTT session scenario
    pub mqtt: MqttConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.baud == 0 {
            return Err(ConfigError::invalid("serial.baud", "must be non-zero"));
        }
        if self.serial.timeout_ms == 0 {
            return Err(ConfigError::invalid("serial.timeout_ms", "must be non-zero"));
        }
        if self.serial.poll_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "serial.poll_interval_ms",
                "must be non-zero",
            ));
        }
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::invalid(
                "serial.port",
                "is empty (pass --port or set AT_PROBE_SERIAL_PORT)",
            ));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::invalid("mqtt.port", "must be non-zero"));
        }
        Ok(())
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path of the AT command UART
    pub port: String,
    /// Baud rate
    pub baud: u32,
    /// Default per-command response timeout in milliseconds
    pub timeout_ms: u64,
    /// Line ending appended to each command
    pub line_ending: LineEnding,
    /// Longest single wait inside the read loop, in milliseconds
    pub poll_interval_ms: u64,
    /// Pause after opening the port before the first command
    pub settle_ms: u64,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud: 115_200,
            timeout_ms: 2000,
            line_ending: LineEnding::CrLf,
            poll_interval_ms: 50,
            settle_ms: 500,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Get the default timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Engine defaults derived from this section.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            timeout: self.timeout(),
            line_ending: self.line_ending,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// OTA memory policy section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Smallest acceptable contiguous PSRAM block
    pub min_psram_bytes: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            min_psram_bytes: MIN_PSRAM_BYTES,
        }
    }
}

/// WiFi station settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: Option<String>,
    pub password: Option<String>,
    /// `AT+CWJAP` can take many seconds while the AP handshake runs
    pub join_timeout_ms: u64,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: None,
            password: None,
            join_timeout_ms: 15_000,
        }
    }
}

impl WifiConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// MQTT broker settings for the live session scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// ESP-AT connection scheme: 1 = TCP, 2 = TLS no verify, 5 = mutual TLS, ...
    pub scheme: u8,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub topic: String,
    pub message: String,
    /// TLS server name; required by brokers that route on SNI
    pub sni: Option<String>,
    /// SNTP server to sync before connecting (TLS needs a valid clock)
    pub sntp_server: Option<String>,
    pub connect_timeout_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "test.mosquitto.org".to_string(),
            port: 1883,
            scheme: 1,
            client_id: "at_probe".to_string(),
            username: String::new(),
            password: String::new(),
            topic: "at-probe/test".to_string(),
            message: "hello_from_at_probe".to_string(),
            sni: None,
            sntp_server: None,
            connect_timeout_ms: 10_000,
        }
    }
}

impl MqttConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error" or a full EnvFilter directive
    pub level: String,
    /// Log format: "pretty" or "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    Pretty,
    /// Single-line output
    #[default]
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.serial.line_ending, LineEnding::CrLf);
        assert_eq!(config.memory.min_psram_bytes, 1_572_864);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_alias_resolution() {
        let mut config = SerialConfig::default();
        config
            .port_aliases
            .insert("c5".to_string(), "/dev/ttyUSB1".to_string());

        assert_eq!(config.resolve_port("c5"), "/dev/ttyUSB1");
        assert_eq!(config.resolve_port("/dev/ttyACM0"), "/dev/ttyACM0");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("line_ending = \"crlf\""));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [serial]
            port = "/dev/ttyUSB1"
            baud = 921600
            line_ending = "cr"

            [memory]
            min_psram_bytes = 2097152
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.serial.baud, 921_600);
        assert_eq!(config.serial.line_ending, LineEnding::Cr);
        assert_eq!(config.memory.min_psram_bytes, 2_097_152);
        // Defaults should still work
        assert_eq!(config.serial.timeout_ms, 2000);
        assert_eq!(config.mqtt.port, 1883);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = Config::default();
        config.serial.baud = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key: "serial.baud", .. })
        ));

        let mut config = Config::default();
        config.serial.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_settings_from_serial() {
        let serial = SerialConfig {
            timeout_ms: 750,
            line_ending: LineEnding::Lf,
            ..Default::default()
        };
        let settings = serial.engine_settings();
        assert_eq!(settings.timeout, Duration::from_millis(750));
        assert_eq!(settings.line_ending, LineEnding::Lf);
    }
}
