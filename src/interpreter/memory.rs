//! `AT+FWMEMINFO?` report parsing and the OTA buffering verdict.

use super::lines::data_lines;
use serde::{Deserialize, Serialize};

/// Minimum contiguous PSRAM needed to buffer a firmware image (1.5 MiB).
pub const MIN_PSRAM_BYTES: u64 = 1_572_864;

/// Name of the data lines carrying the report.
pub const MEMINFO_NAME: &str = "FWMEMINFO";

/// Free and largest-block sizes for both memory pools, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReport {
    pub psram_free: u64,
    pub psram_largest: u64,
    pub internal_free: u64,
    pub internal_largest: u64,
}

/// Parse the `+FWMEMINFO:<POOL>,<free>,<largest>` lines of a reply.
///
/// Missing pools and unparseable numbers stay 0; each field is parsed on its
/// own so a half-valid line still contributes what it can.
pub fn parse_memory_report(raw: &str) -> MemoryReport {
    let mut report = MemoryReport::default();

    for line in data_lines(raw, MEMINFO_NAME) {
        let (free, largest) = match line.fields.first().map(String::as_str) {
            Some("PSRAM") => (&mut report.psram_free, &mut report.psram_largest),
            Some("INTERNAL") => (&mut report.internal_free, &mut report.internal_largest),
            _ => continue,
        };
        if let Some(n) = line.u64_field(1) {
            *free = n;
        }
        if let Some(n) = line.u64_field(2) {
            *largest = n;
        }
    }

    report
}

/// Whether the PSRAM pool can hold an OTA image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Sufficient,
    /// PSRAM exists but its largest free block is too small.
    Insufficient,
    /// No PSRAM reported at all.
    NotDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub threshold: u64,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.status == VerdictStatus::Sufficient
    }
}

/// Judge the largest PSRAM block against `threshold`.
pub fn evaluate(report: &MemoryReport, threshold: u64) -> Verdict {
    let status = match report.psram_largest {
        0 => VerdictStatus::NotDetected,
        n if n < threshold => VerdictStatus::Insufficient,
        _ => VerdictStatus::Sufficient,
    };
    Verdict { status, threshold }
}
