//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult, CONFIG_ENV, CONFIG_FLAG};
use super::schema::Config;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "AT_PROBE";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "at-probe.toml";

/// Config file name inside the per-user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `AT_PROBE_CONFIG` environment variable (explicit path)
    /// 2. `./at-probe.toml` (current directory)
    /// 3. `~/.config/at-probe/config.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\at-probe\config.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    ///
    /// A path in `AT_PROBE_CONFIG` must exist; the search only falls through
    /// when the variable is unset.
    pub fn load() -> ConfigResult<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            if !path.exists() {
                return Err(ConfigError::missing(&path, CONFIG_ENV));
            }
        }
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    ///
    /// Unlike [`load`](Self::load), a missing file is an error here: the
    /// operator asked for this file by name.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::missing(&path, CONFIG_FLAG));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&name).ok().map(|val| (name, val))
}

fn parse_env<T: std::str::FromStr>(name: &str, val: &str, what: &str) -> ConfigResult<T> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::bad_env(name, val, format!("expected a {}", what)))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `AT_PROBE_<SECTION>_<KEY>`
/// For example:
/// - `AT_PROBE_SERIAL_PORT=/dev/ttyUSB1`
/// - `AT_PROBE_SERIAL_BAUD=921600`
/// - `AT_PROBE_MEMORY_MIN_PSRAM_BYTES=2097152`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Some((_, val)) = env_var("SERIAL_PORT") {
        config.serial.port = val;
    }
    if let Some((name, val)) = env_var("SERIAL_BAUD") {
        config.serial.baud = parse_env(&name, &val, "baud rate")?;
    }
    if let Some((name, val)) = env_var("SERIAL_TIMEOUT_MS") {
        config.serial.timeout_ms = parse_env(&name, &val, "timeout")?;
    }
    if let Some((name, val)) = env_var("SERIAL_LINE_ENDING") {
        config.serial.line_ending = val
            .parse()
            .map_err(|reason: String| ConfigError::bad_env(&name, &val, reason))?;
    }

    // Memory policy
    if let Some((name, val)) = env_var("MEMORY_MIN_PSRAM_BYTES") {
        config.memory.min_psram_bytes = parse_env(&name, &val, "byte count")?;
    }

    // WiFi credentials are better kept out of files
    if let Some((_, val)) = env_var("WIFI_SSID") {
        config.wifi.ssid = Some(val);
    }
    if let Some((_, val)) = env_var("WIFI_PASSWORD") {
        config.wifi.password = Some(val);
    }

    // MQTT
    if let Some((_, val)) = env_var("MQTT_HOST") {
        config.mqtt.host = val;
    }
    if let Some((name, val)) = env_var("MQTT_PORT") {
        config.mqtt.port = parse_env(&name, &val, "port number")?;
    }

    if let Some((_, val)) = env_var("LOG_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("at-probe"))
}

/// Get the default config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}
