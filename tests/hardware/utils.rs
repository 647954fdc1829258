//! Utility functions for hardware testing.

use at_probe::engine::{CommandEngine, EngineSettings};
use at_probe::port::{PortConfiguration, SyncSerialPort};
use std::env;
use std::time::{Duration, Instant};

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
}

impl TestPortConfig {
    /// `TEST_PORT` (required) and `TEST_BAUD` (default 115200).
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(115_200);

        Some(TestPortConfig {
            port_name,
            baud_rate,
        })
    }

    /// Open the port and wrap it in an engine with default settings.
    pub fn engine(&self) -> CommandEngine<SyncSerialPort> {
        let port = SyncSerialPort::open(&self.port_name, PortConfiguration::with_baud(self.baud_rate))
            .unwrap_or_else(|e| panic!("failed to open {}: {}", self.port_name, e));
        std::thread::sleep(Duration::from_millis(500));
        CommandEngine::with_settings(port, EngineSettings::default())
    }
}

/// Skip test if hardware is not available.
pub fn skip_without_hardware() -> Option<TestPortConfig> {
    let config = TestPortConfig::from_env();
    if config.is_none() {
        println!("Skipping hardware test: TEST_PORT not set");
    }
    config
}

/// Timing helper for measuring operation duration.
pub struct TimingHelper {
    start: Instant,
    name: String,
}

impl TimingHelper {
    pub fn new(name: &str) -> Self {
        TimingHelper {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        println!("{} took {:?}", self.name, elapsed);
        elapsed
    }
}
