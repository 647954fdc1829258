//! Incremental terminator detection over the accumulating reply buffer.

use super::Status;
use memchr::memchr2_iter;

const OK_LINE: &[u8] = b"OK";
const ERROR_LINE: &[u8] = b"ERROR";

/// Scans complete lines as bytes arrive and reports the first terminator.
///
/// A line is complete once a CR or LF follows it. Only a line that is exactly
/// `OK` or `ERROR` counts; `+MQTTSUBRECV:...error...` or `SEND OK` do not.
#[derive(Debug, Default)]
pub(crate) struct TerminatorScan {
    /// Start of the line currently being assembled.
    line_start: usize,
}

impl TerminatorScan {
    /// Look at bytes appended since the last call.
    pub(crate) fn feed(&mut self, buf: &[u8]) -> Option<Status> {
        let from = self.line_start;
        for offset in memchr2_iter(b'\r', b'\n', &buf[from..]) {
            let end = from + offset;
            let line = &buf[self.line_start..end];
            self.line_start = end + 1;

            if line == OK_LINE {
                return Some(Status::Success);
            }
            if line == ERROR_LINE {
                return Some(Status::Failure);
            }
        }
        None
    }
}
