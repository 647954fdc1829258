//! Configuration module for at-probe.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `AT_PROBE_CONFIG` environment variable (explicit path)
//! 2. `./at-probe.toml` (current directory)
//! 3. `~/.config/at-probe/config.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\at-probe\config.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Environment Overrides
//!
//! The pattern is: `AT_PROBE_<SECTION>_<KEY>`
//!
//! Examples:
//! - `AT_PROBE_SERIAL_PORT=/dev/ttyUSB1`
//! - `AT_PROBE_SERIAL_LINE_ENDING=cr`
//! - `AT_PROBE_WIFI_SSID=lab`, `AT_PROBE_WIFI_PASSWORD=...`
//!
//! # Example
//!
//! ```rust,no_run
//! use at_probe::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Port: {} @ {}", config.serial.port, config.serial.baud);
//! # Ok::<(), at_probe::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, MemoryConfig, MqttConfig, SerialConfig, WifiConfig,
};
