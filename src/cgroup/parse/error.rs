//! Defines structured error types for parsing cgroup statistics.
//!
//! [`StatParseError`] carries the line and the offending value of a stat file that could
//! not be parsed. Parsers return it wrapped into a [`std::io::Error`] of kind
//! [`std::io::ErrorKind::InvalidData`], and [`crate::Error::Value`] unwraps it again once
//! the path of the file is known.
//!
//! # Example
//!
//! ```rust
//! use std::io;
//! use cgroup_stats::cgroup::parse::StatParseError;
//!
//! fn parse_line(val: &str) -> io::Result<u64> {
//!     let value = val.parse::<u64>().map_err(|e| {
//!         StatParseError::InvalidValue {
//!             value: val.to_string(),
//!             line: 1,
//!             source: e,
//!         }
//!     })?;
//!     Ok(value)
//! }
//!
//! parse_line("not-a-number").unwrap_err();
//! ```

use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid decimal for '{key}' at line {line}: '{value}': {source}")]
    InvalidDecimal {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseFloatError,
    },

    #[error("invalid value at line {line}: '{value}': {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("malformed line {line}: '{content}'")]
    InvalidLine { content: String, line: usize },

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StatParseError> for std::io::Error {
    fn from(err: StatParseError) -> Self {
        match err {
            StatParseError::Io(e) => e,
            err => std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        }
    }
}

/// Extracts a `StatParseError` from an `std::io::Error` assuming it was wrapped.
///
/// Panics if the inner error is not a `StatParseError`. Intended for use in test assertions only.
#[cfg(test)]
pub(crate) fn extract_stat_parse_error(err: &std::io::Error) -> &StatParseError {
    err.get_ref()
        .and_then(|e| e.downcast_ref::<StatParseError>())
        .unwrap()
}
