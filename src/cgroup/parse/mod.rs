//! Parsing of cgroup stat files.
//!
//! The parsers only deal with buffered readers; opening files and attributing failures to
//! a path is left to the v1/v2 readers.

mod error;
mod parser;
mod values;

pub use error::StatParseError;
pub use parser::{Handlers, KeyValueStat, SingleLineStat};
pub use values::{Counter, CpuMax, CpusetCount, Limit, V1_UNLIMITED, parse_psi};

#[cfg(test)]
pub(crate) use error::extract_stat_parse_error;
