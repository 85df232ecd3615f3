//! Block I/O accounting on the unified hierarchy.
//!
//! `io.stat` has one line per device, starting with the `major:minor` device number:
//!
//! ```text
//! 8:0 rbytes=1024 wbytes=2048 rios=12 wios=24 dbytes=0 dios=0
//! ```
//!
//! `io.max` uses the same layout for throttling limits, with `max` for unlimited:
//!
//! ```text
//! 8:0 rbps=1048576 wbps=max riops=max wiops=120
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use crate::cgroup::parse::{Handlers, KeyValueStat, Limit, StatParseError, parse_psi};
use crate::cgroup::read;
use crate::cgroup::stats::{DeviceIoStats, IoStats};
use crate::error::Result;

/// One device line of `io.stat`; the leading device number is skipped by the parser.
#[derive(Debug, Default)]
struct IoStatLine(DeviceIoStats);

static HANDLERS: LazyLock<Handlers<IoStatLine>> = LazyLock::new(|| {
    let mut m: Handlers<IoStatLine> = HashMap::with_capacity(4);
    m.insert("rbytes", |s, v| s.0.read_bytes = Some(v));
    m.insert("wbytes", |s, v| s.0.write_bytes = Some(v));
    m.insert("rios", |s, v| s.0.read_operations = Some(v));
    m.insert("wios", |s, v| s.0.write_operations = Some(v));
    m
});

impl KeyValueStat for IoStatLine {
    const SPLIT_CHAR: Option<char> = Some('=');
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 1;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = true;

    fn field_handlers() -> &'static Handlers<Self> {
        &HANDLERS
    }
}

/// Parses `io.stat` into per-device counters.
fn parse_io_stat<R: BufRead>(buf: &mut R) -> std::io::Result<BTreeMap<String, DeviceIoStats>> {
    let mut devices = BTreeMap::new();
    let handlers = IoStatLine::field_handlers();

    let mut line = String::new();
    let mut lineno = 0;
    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        if let Some(device) = line.split_whitespace().next() {
            let mut stat = IoStatLine::default();
            let mut seen_keys = HashSet::with_capacity(handlers.len());
            IoStatLine::parse_line(&mut stat, &line, lineno, handlers, &mut seen_keys)?;
            devices.insert(device.to_owned(), stat.0);
        }
        line.clear();
    }

    Ok(devices)
}

/// Parses `io.max` into per-device limits.
fn parse_io_max<R: BufRead>(buf: &mut R) -> std::io::Result<BTreeMap<String, DeviceIoStats>> {
    let mut devices = BTreeMap::new();

    let mut line = String::new();
    let mut lineno = 0;
    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        let mut parts = line.split_whitespace();
        if let Some(device) = parts.next() {
            let mut limits = DeviceIoStats::default();
            for (key, value) in parts.filter_map(|part| part.split_once('=')) {
                let limit = Limit::parse_token(value).map_err(|source| {
                    StatParseError::InvalidKeyValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        line: lineno,
                        source,
                    }
                })?;
                match key {
                    "rbps" => limits.read_bytes_limit = limit,
                    "wbps" => limits.write_bytes_limit = limit,
                    "riops" => limits.read_operations_limit = limit,
                    "wiops" => limits.write_operations_limit = limit,
                    _ => {}
                }
            }
            devices.insert(device.to_owned(), limits);
        }
        line.clear();
    }

    Ok(devices)
}

/// Reads the I/O stats of the cgroup directory `dir`.
pub(super) fn read_io_stats(dir: &Path) -> Result<IoStats> {
    let devices = read::read_controller_file(&dir.join("io.stat"), "io", parse_io_stat)?;

    let mut stats = IoStats {
        devices,
        ..Default::default()
    };
    stats.compute_totals();

    if let Some(limits) = read::read_optional(&dir.join("io.max"), parse_io_max) {
        for (device, limit) in limits {
            stats.devices.entry(device).or_default().merge(limit);
        }
    }
    if let Some((some, full)) = read::read_optional(&dir.join("io.pressure"), parse_psi) {
        stats.psi_some = some;
        stats.psi_full = full;
    }

    Ok(stats)
}
