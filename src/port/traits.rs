//! The byte channel the command engine drives, and how to open it.

use super::error::PortError;
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::{Duration, Instant};

/// Line settings for opening a port.
///
/// ESP-AT UARTs ship as 8N1 without flow control; only the baud rate is
/// commonly changed (`AT+UART_DEF`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub flow_control: FlowControl,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Write timeout and initial read timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_millis(100),
        }
    }
}

impl PortConfiguration {
    /// 8N1 at the given baud rate.
    pub fn with_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Default::default()
        }
    }
}

/// Trait for serial port I/O operations.
///
/// This is the byte-level duplex channel the command engine drives. Real
/// hardware ports and the scripted mock both implement it.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Return whatever bytes are queued, waiting at most `max_wait` for the
    /// first one to arrive. An empty vector means nothing arrived in time.
    fn read_available(&mut self, max_wait: Duration) -> Result<Vec<u8>, PortError>;

    /// Discard queued, unread input so stale output is not attributed to
    /// the next command.
    fn reset_input_buffer(&mut self) -> Result<(), PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Read everything that arrives within `window`.
    ///
    /// `stop` sees each new chunk together with everything accumulated so far
    /// and returns `true` to end the loop early.
    fn listen(
        &mut self,
        window: Duration,
        poll_interval: Duration,
        stop: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<Vec<u8>, PortError> {
        let started = Instant::now();
        let mut seen = Vec::new();

        while let Some(remaining) = window.checked_sub(started.elapsed()) {
            let chunk = self.read_available(remaining.min(poll_interval))?;
            if chunk.is_empty() {
                continue;
            }
            seen.extend_from_slice(&chunk);
            if stop(&chunk, &seen) {
                break;
            }
        }

        Ok(seen)
    }
}

impl<P: SerialPortAdapter + ?Sized> SerialPortAdapter for Box<P> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        (**self).write_bytes(data)
    }

    fn read_available(&mut self, max_wait: Duration) -> Result<Vec<u8>, PortError> {
        (**self).read_available(max_wait)
    }

    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        (**self).reset_input_buffer()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
