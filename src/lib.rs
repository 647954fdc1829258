//! AT command diagnostic harness for ESP-AT modems.
//!
//! This library drives an ESP32 running ESP-AT over a serial link: it sends
//! one command at a time, classifies each reply by its terminator line, and
//! interprets structured replies such as the `+FWMEMINFO` memory report.
//!
//! # Modules
//!
//! - `port`: Transport trait, the serialport-backed implementation and a scripted mock
//! - `engine`: Command framing, the request/response loop and classification
//! - `interpreter`: Reply line model and the OTA memory verdict
//! - `scenario`: Diagnostic sequences built from command exchanges
//! - `report`: Console transcript and byte formatting
//! - `config`: Configuration management with TOML support
//! - `error`: Unified error handling

pub mod config;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod port;
pub mod report;
pub mod scenario;

// Re-export commonly used types for convenience
pub use engine::{
    Classification, Command, CommandEngine, EngineError, EngineSettings, LineEnding, Status,
};
pub use error::{AppError, AppResult};
pub use interpreter::{
    evaluate, parse_memory_report, MemoryReport, Verdict, VerdictStatus, MIN_PSRAM_BYTES,
};
pub use port::{MockSerialPort, PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
