//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that plays back scripted device replies without
//! requiring actual hardware. Each write pops the next reply script; the
//! script is then delivered one chunk per `read_available` poll, which is how
//! fragmented firmware output looks on a real UART.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockPortState {
    /// Chunks waiting to be returned by `read_available`, one per poll.
    read_queue: VecDeque<Vec<u8>>,
    /// Reply scripts, consumed one per write.
    replies: VecDeque<Vec<Vec<u8>>>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Number of `reset_input_buffer` calls.
    resets: usize,
    /// Fail the next write with a broken-pipe error.
    fail_next_write: bool,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the other is moved into the command engine.
///
/// # Example
/// ```
/// use at_probe::port::{MockSerialPort, SerialPortAdapter};
/// use std::time::Duration;
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.reply(&[b"AT\r\n", b"OK\r\n"]);
///
/// port.write_bytes(b"AT\r\n").unwrap();
/// assert_eq!(port.read_available(Duration::ZERO).unwrap(), b"AT\r\n");
/// assert_eq!(port.read_available(Duration::ZERO).unwrap(), b"OK\r\n");
/// assert_eq!(port.get_write_log(), vec![b"AT\r\n".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, wrapped in Arc<Mutex<>> for interior mutability.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockPortState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Script the device's answer to the next unanswered write.
    ///
    /// Each chunk is returned by a separate poll. An empty chunk is a poll on
    /// which nothing arrives.
    pub fn reply(&mut self, chunks: &[&[u8]]) {
        self.state()
            .replies
            .push_back(chunks.iter().map(|c| c.to_vec()).collect());
    }

    /// Script a write that gets no answer at all.
    pub fn reply_silence(&mut self) {
        self.state().replies.push_back(Vec::new());
    }

    /// Queue unsolicited bytes (boot banner, stale output) for reading now.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state().read_queue.push_back(data.to_vec());
    }

    /// Make the next write fail with an I/O error.
    pub fn fail_next_write(&mut self) {
        self.state().fail_next_write = true;
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state().write_log.clone()
    }

    /// Writes decoded as text, for readable assertions.
    pub fn written_lines(&self) -> Vec<String> {
        self.state()
            .write_log
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Number of times the input buffer was reset.
    pub fn reset_count(&self) -> usize {
        self.state().resets
    }

    /// Reply scripts not yet consumed by a write.
    pub fn pending_replies(&self) -> usize {
        self.state().replies.len()
    }

    /// Number of queued read chunks.
    pub fn available_chunks(&self) -> usize {
        self.state().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state();

        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }

        state.write_log.push(data.to_vec());
        if let Some(script) = state.replies.pop_front() {
            state.read_queue.extend(script);
        }

        Ok(data.len())
    }

    fn read_available(&mut self, max_wait: Duration) -> Result<Vec<u8>, PortError> {
        let chunk = self.state().read_queue.pop_front().unwrap_or_default();
        if chunk.is_empty() {
            // A real port blocks until its read timeout expires.
            std::thread::sleep(max_wait);
        }
        Ok(chunk)
    }

    fn reset_input_buffer(&mut self) -> Result<(), PortError> {
        let mut state = self.state();
        state.read_queue.clear();
        state.resets += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_chunks", &self.available_chunks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_is_released_by_write() {
        let mut port = MockSerialPort::new("MOCK0");
        port.reply(&[b"OK\r\n"]);
        assert_eq!(port.read_available(Duration::ZERO).unwrap(), b"");

        port.write_bytes(b"AT\r\n").unwrap();
        assert_eq!(port.read_available(Duration::ZERO).unwrap(), b"OK\r\n");
    }

    #[test]
    fn test_chunks_are_delivered_one_per_poll() {
        let mut port = MockSerialPort::new("MOCK0");
        port.reply(&[b"O", b"", b"K\r\n"]);
        port.write_bytes(b"AT\r\n").unwrap();

        assert_eq!(port.read_available(Duration::ZERO).unwrap(), b"O");
        assert_eq!(port.read_available(Duration::ZERO).unwrap(), b"");
        assert_eq!(port.read_available(Duration::ZERO).unwrap(), b"K\r\n");
        assert_eq!(port.available_chunks(), 0);
    }

    #[test]
    fn test_write_logging() {
        let mut port = MockSerialPort::new("MOCK0");
        port.write_bytes(b"Test1").unwrap();
        port.write_bytes(b"Test2").unwrap();

        let log = port.get_write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], b"Test1");
        assert_eq!(log[1], b"Test2");
    }

    #[test]
    fn test_reset_discards_stale_input() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"stale\r\n");

        port.reset_input_buffer().unwrap();
        assert_eq!(port.reset_count(), 1);
        assert_eq!(port.available_chunks(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let port = MockSerialPort::new("MOCK0");
        let mut moved = port.clone();
        moved.write_bytes(b"AT\r\n").unwrap();
        assert_eq!(port.written_lines(), vec!["AT\r\n".to_string()]);
    }

    #[test]
    fn test_write_failure_simulation() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_next_write();

        let result = port.write_bytes(b"AT\r\n");
        assert!(matches!(result, Err(PortError::Io(_))));
        assert!(port.write_bytes(b"AT\r\n").is_ok());
    }

    #[test]
    fn test_listen_stops_on_predicate() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"boot: rst:0x1\r\n");
        port.enqueue_read(b"rea");
        port.enqueue_read(b"dy\r\n");
        port.enqueue_read(b"after\r\n");

        let seen = port
            .listen(
                Duration::from_millis(200),
                Duration::from_millis(5),
                &mut |_, seen| seen.windows(5).any(|w| w == b"ready"),
            )
            .unwrap();

        assert!(seen.ends_with(b"ready\r\n"));
        assert_eq!(port.available_chunks(), 1);
    }
}
