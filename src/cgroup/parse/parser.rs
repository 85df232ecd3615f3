//! Generic traits for parsing Linux cgroup statistics files into structured types.
//!
//! - [`KeyValueStat`]: multi-line, key-value formatted files such as `cpu.stat`,
//!   `memory.stat`, `cpuacct.stat` or one line of `io.stat`. Parsing behavior (separator,
//!   skipped tokens, duplicate handling) is configured through associated constants.
//! - [`SingleLineStat`]: single-line files such as `memory.current` or `pids.max`.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use cgroup_stats::cgroup::parse::{Handlers, KeyValueStat};
//!
//! #[derive(Default)]
//! struct OomEvents {
//!     oom: Option<u64>,
//!     oom_kill: Option<u64>,
//! }
//!
//! static HANDLERS: LazyLock<Handlers<OomEvents>> = LazyLock::new(|| {
//!     let mut m: Handlers<OomEvents> = HashMap::with_capacity(2);
//!     m.insert("oom", |s, v| s.oom = Some(v));
//!     m.insert("oom_kill", |s, v| s.oom_kill = Some(v));
//!     m
//! });
//!
//! impl KeyValueStat for OomEvents {
//!     const SPLIT_CHAR: Option<char> = None;
//!     const SKIP_LINES: usize = 0;
//!     const SKIP_VALUES: usize = 0;
//!     const ALLOW_DUPLICATE_KEYS: bool = false;
//!     const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;
//!
//!     fn field_handlers() -> &'static Handlers<Self> {
//!         &HANDLERS
//!     }
//! }
//!
//! let events = OomEvents::from_reader(&mut "low 0\noom 2\noom_kill 1\n".as_bytes()).unwrap();
//! assert_eq!(events.oom, Some(2));
//! assert_eq!(events.oom_kill, Some(1));
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// Maps a field name to the function applying its parsed value.
pub type Handlers<T> = HashMap<&'static str, fn(&mut T, u64)>;

/// A trait for parsing structured key-value style stat files.
///
/// Implementors define a set of known keys and how to apply values for them. Keys
/// without a handler are passed to [`KeyValueStat::on_unknown_key`].
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// If set to `Some(char)`, each key-value pair is expected to be joined by that character,
    /// e.g. `rbytes=123` with `Some('=')`.
    ///
    /// If `None`, keys and values are separated by whitespace, like `"somekey 123"`.
    const SPLIT_CHAR: Option<char>;

    /// The number of lines at the start of the file to skip before parsing begins.
    const SKIP_LINES: usize;

    /// The number of whitespace-separated tokens to skip at the start of *each line*.
    const SKIP_VALUES: usize;

    /// If `false`, encountering the same key more than once is an error.
    const ALLOW_DUPLICATE_KEYS: bool;

    /// If `false`, only the first key-value pair on each line is parsed.
    const ALLOW_MULTIPLE_KV_PER_LINE: bool;

    /// Returns the known field names and the handlers applying their parsed values.
    fn field_handlers() -> &'static Handlers<Self>;

    /// Parses a key-value formatted buffer into a fresh `Self`.
    ///
    /// Skips the first `SKIP_LINES` lines, then processes each line using the configured
    /// split behavior and handler mapping.
    ///
    /// # Errors
    /// Returns an `io::Error` if reading fails, or a `StatParseError` wrapped in `io::Error`
    /// if parsing fails.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let field_count = handlers.len();
        let mut seen_keys = HashSet::with_capacity(field_count);

        let mut line = String::new();
        let mut lineno = 0;
        for _ in 0..Self::SKIP_LINES {
            buf.read_line(&mut line)?;
            line.clear();
        }

        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            Self::parse_line(&mut stat, &line, lineno, handlers, &mut seen_keys)?;
            if !Self::ALLOW_DUPLICATE_KEYS && seen_keys.len() == field_count {
                break;
            }

            line.clear();
        }

        Ok(stat)
    }

    /// Parses a single line into one or more key-value pairs based on the trait configuration.
    ///
    /// `lineno` is only used for error reporting; `seen_keys` tracks keys for the
    /// duplicate check.
    fn parse_line(
        stat: &mut Self,
        line: &str,
        lineno: usize,
        handlers: &Handlers<Self>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let mut parts = line.split_whitespace().skip(Self::SKIP_VALUES);

        if let Some(split_char) = Self::SPLIT_CHAR {
            Self::parse_split_pairs(&mut parts, split_char, stat, lineno, handlers, seen_keys)
        } else {
            Self::parse_flat_pairs(&mut parts, stat, lineno, handlers, seen_keys)
        }
    }

    /// Parses a line with space-separated alternating key/value tokens (e.g., `key1 123 key2 456`).
    fn parse_flat_pairs<'a>(
        parts: &mut impl Iterator<Item = &'a str>,
        stat: &mut Self,
        lineno: usize,
        handlers: &Handlers<Self>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        while let (Some(key), Some(val)) = (parts.next(), parts.next()) {
            Self::parse_and_set(key, val, stat, lineno, handlers, seen_keys)?;
            if !Self::ALLOW_MULTIPLE_KV_PER_LINE {
                break;
            }
        }
        Ok(())
    }

    /// Parses a line with `key<split_char>value` tokens (e.g., `key1=123 key2=456`).
    ///
    /// Tokens without `split_char` are ignored.
    fn parse_split_pairs<'a>(
        parts: &mut impl Iterator<Item = &'a str>,
        split_char: char,
        stat: &mut Self,
        lineno: usize,
        handlers: &Handlers<Self>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        for part in parts {
            if let Some((key, val)) = part.split_once(split_char) {
                Self::parse_and_set(key, val, stat, lineno, handlers, seen_keys)?;
            }
            if !Self::ALLOW_MULTIPLE_KV_PER_LINE {
                break;
            }
        }
        Ok(())
    }

    /// Parses a single key-value pair and updates the target struct via the field handler.
    ///
    /// # Errors
    /// Returns a `StatParseError::InvalidKeyValue` if the value cannot be parsed as `u64`,
    /// or `StatParseError::DuplicateField` if the key appears more than once and duplicates
    /// are disallowed.
    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        handlers: &Handlers<Self>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let Some((k, handler)) = handlers.get_key_value(key) else {
            return Self::on_unknown_key(key, val, lineno);
        };

        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !Self::ALLOW_DUPLICATE_KEYS && !seen_keys.insert(k) {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            }
            .into());
        }
        handler(stat, parsed);
        Ok(())
    }

    /// Called when a key in the input is not found in the `field_handlers()` map.
    ///
    /// Kernels add keys to stat files over time, so unknown keys are ignored by default.
    #[inline]
    fn on_unknown_key(_key: &str, _val: &str, _lineno: usize) -> std::io::Result<()> {
        Ok(())
    }
}

/// A trait for parsing single-line, single-value statistics, such as
/// `memory.current` or `pids.max` files.
pub trait SingleLineStat: Sized {
    /// Parses the value of the trimmed first line.
    fn parse_value(value: &str) -> std::io::Result<Self>;

    /// Reads the first line from `buf` and parses it with [`SingleLineStat::parse_value`].
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if reading fails or a wrapped `StatParseError` if the value
    /// is malformed.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut line = String::new();
        buf.read_line(&mut line)?;
        Self::parse_value(line.trim())
    }
}
