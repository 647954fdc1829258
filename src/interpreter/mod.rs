//! Response interpretation: typed views over raw reply text.

pub mod lines;
pub mod memory;

pub use lines::{complete_lines, data_lines, error_code, parse_lines, DataLine, ReplyLine};
pub use memory::{
    evaluate, parse_memory_report, MemoryReport, Verdict, VerdictStatus, MIN_PSRAM_BYTES,
};
