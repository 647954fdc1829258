//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `SerialPortAdapter`
//! trait for dependency injection and testing.

use super::error::PortError;
use super::traits::{PortConfiguration, SerialPortAdapter};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// Size of the scratch buffer used for each `read_available` call.
const READ_CHUNK: usize = 1024;

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
///
/// The port is released when the value is dropped, so every exit path of the
/// program (including `?` early returns) gives the device back.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
    /// Timeout currently programmed into the driver.
    programmed_timeout: Duration,
    /// Timeout applied to writes.
    write_timeout: Duration,
}

impl SyncSerialPort {
    /// Open a serial port with the given configuration.
    ///
    /// # Arguments
    /// * `port_name` - The system path to the serial port (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `config` - Configuration parameters for the port
    ///
    /// # Example
    /// ```no_run
    /// use at_probe::port::{SyncSerialPort, PortConfiguration};
    ///
    /// let config = PortConfiguration::with_baud(115200);
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", config)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: PortConfiguration) -> Result<Self, PortError> {
        let builder = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits)
            .flow_control(config.flow_control)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .timeout(config.timeout);

        // On unix the driver takes TIOCEXCL, so a second opener gets EBUSY.
        let port = builder
            .open()
            .map_err(|e| PortError::from_open_error(port_name, e))?;

        debug!(port = port_name, baud = config.baud_rate, "serial port opened");

        Ok(Self {
            port,
            name: port_name.to_string(),
            programmed_timeout: config.timeout,
            write_timeout: config.timeout,
        })
    }

    /// Release the port explicitly.
    pub fn close(self) {
        debug!(port = %self.name, "serial port closed");
    }

    fn program_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        if self.programmed_timeout != timeout {
            self.port.set_timeout(timeout).map_err(PortError::Serial)?;
            self.programmed_timeout = timeout;
        }
        Ok(())
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.program_timeout(self.write_timeout)?;
        self.port.write_all(data).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => PortError::timeout(self.write_timeout),
            _ => PortError::Io(e),
        })?;
        self.port.flush().map_err(PortError::Io)?;
        Ok(data.len())
    }

    fn read_available(&mut self, max_wait: Duration) -> Result<Vec<u8>, PortError> {
        let pending = self.port.bytes_to_read().map_err(PortError::Serial)? as usize;
        // Nothing queued: let the driver block for at most `max_wait`.
        if pending == 0 {
            self.program_timeout(max_wait)?;
        }

        let mut buffer = vec![0u8; pending.clamp(1, READ_CHUNK)];
        match self.port.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                trace!(port = %self.name, bytes = n, "read chunk");
                Ok(buffer)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(PortError::Serial)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// One entry from [`list_ports`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PortListing {
    pub port_name: String,
    pub kind: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Enumerate serial ports visible to the OS.
pub fn list_ports() -> Result<Vec<PortListing>, PortError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|info| match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => PortListing {
                port_name: info.port_name,
                kind: "usb".into(),
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            other => PortListing {
                port_name: info.port_name,
                kind: match other {
                    serialport::SerialPortType::BluetoothPort => "bluetooth",
                    serialport::SerialPortType::PciPort => "pci",
                    _ => "unknown",
                }
                .into(),
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
            },
        })
        .collect())
}
