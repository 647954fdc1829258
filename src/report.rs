//! Console output for scenario runs.
//!
//! Human-readable mode prints a `>>>`/`<<<` transcript with a status label
//! per exchange. JSON mode stays silent until the end and then prints one
//! [`Outcome`](crate::scenario::Outcome) document.

use crate::engine::Classification;
use crate::interpreter::lines::split_lines;
use std::io::{self, Write};

const RULE_WIDTH: usize = 60;

enum Sink {
    Stdout(io::Stdout),
    Buffer(Vec<u8>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::Buffer(b) => b.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::Buffer(_) => Ok(()),
        }
    }
}

/// Where scenario text goes.
pub struct Console {
    sink: Sink,
    /// Suppress the human-readable transcript (JSON mode).
    quiet: bool,
}

impl Console {
    pub fn stdout(quiet: bool) -> Self {
        Self {
            sink: Sink::Stdout(io::stdout()),
            quiet,
        }
    }

    /// Capture output in memory, for tests.
    pub fn buffered() -> Self {
        Self {
            sink: Sink::Buffer(Vec::new()),
            quiet: false,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Everything captured so far by a [`buffered`](Self::buffered) console.
    pub fn captured(&self) -> String {
        match &self.sink {
            Sink::Buffer(b) => String::from_utf8_lossy(b).into_owned(),
            Sink::Stdout(_) => String::new(),
        }
    }

    /// Free-form line; suppressed in quiet mode.
    pub fn line(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.sink, "{}", text.as_ref())
    }

    /// Pass device output through unchanged, as it arrives.
    pub fn stream(&mut self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        write!(self.sink, "{}", text)?;
        self.sink.flush()
    }

    /// Write regardless of quiet mode (the JSON document itself).
    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.sink, "{}", text)?;
        self.sink.flush()
    }

    pub fn banner(&mut self, title: &str) -> io::Result<()> {
        self.line("=".repeat(RULE_WIDTH))?;
        self.line(title)?;
        self.line("=".repeat(RULE_WIDTH))
    }

    pub fn section(&mut self, title: &str) -> io::Result<()> {
        self.line("")?;
        self.line("-".repeat(40))?;
        self.line(title)?;
        self.line("-".repeat(40))
    }

    pub fn pass(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        self.line(format!("[PASS] {}", message.as_ref()))
    }

    pub fn fail(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        self.line(format!("[FAIL] {}", message.as_ref()))
    }

    pub fn warn(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        self.line(format!("[WARN] {}", message.as_ref()))
    }

    /// Numbered remediation steps.
    pub fn hints(&mut self, heading: &str, steps: &[&str]) -> io::Result<()> {
        if steps.is_empty() {
            return Ok(());
        }
        self.line("")?;
        self.line(heading)?;
        for (i, step) in steps.iter().enumerate() {
            self.line(format!("  {}. {}", i + 1, step))?;
        }
        Ok(())
    }

    /// Transcript of one exchange with its status label.
    pub fn exchange(&mut self, c: &Classification) -> io::Result<()> {
        self.line(format!(">>> {}", c.command))?;
        for line in split_lines(&c.raw) {
            self.line(format!("<<< {}", line))?;
        }
        let code = c
            .error_code()
            .map(|code| format!(", ERR CODE 0x{:08X}", code))
            .unwrap_or_default();
        self.line(format!(
            "[{}] {} ({} ms{})",
            c.status,
            c.command,
            c.elapsed.as_millis(),
            code
        ))
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").field("quiet", &self.quiet).finish()
    }
}

/// `1,572,864 bytes (1.50 MB)`
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    let grouped = group_thousands(bytes);
    if bytes >= MB {
        format!("{} bytes ({:.2} MB)", grouped, bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{} bytes ({:.1} KB)", grouped, bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", grouped)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Status;
    use std::time::Duration;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(999), "999 bytes");
        assert_eq!(format_bytes(150_000), "150,000 bytes (146.5 KB)");
        assert_eq!(format_bytes(1_572_864), "1,572,864 bytes (1.50 MB)");
    }

    #[test]
    fn test_exchange_transcript() {
        let mut console = Console::buffered();
        let c = Classification {
            command: "AT+FOO".into(),
            status: Status::Failure,
            raw: "AT+FOO\r\nERR CODE:0x01090000\r\nERROR\r\n".into(),
            elapsed: Duration::from_millis(7),
        };
        console.exchange(&c).unwrap();

        let text = console.captured();
        assert!(text.contains(">>> AT+FOO\n"));
        assert!(text.contains("<<< ERROR\n"));
        assert!(text.contains("[FAILURE] AT+FOO (7 ms, ERR CODE 0x01090000)"));
    }

    #[test]
    fn test_quiet_console_only_prints_raw() {
        let mut console = Console {
            sink: Sink::Buffer(Vec::new()),
            quiet: true,
        };
        console.pass("hidden").unwrap();
        console.raw("{}").unwrap();
        assert_eq!(console.captured(), "{}\n");
    }
}
