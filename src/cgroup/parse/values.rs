//! Parsers for the small value formats shared by cgroup v1 and v2 files.
//!
//! - plain counters (`memory.current`, `cpuacct.usage`) as [`Counter`],
//! - limits that may be unlimited (`memory.max`, `pids.max`, `memory.limit_in_bytes`,
//!   `cpu.cfs_quota_us`) as [`Limit`],
//! - `cpu.max` as [`CpuMax`],
//! - cpuset lists (`cpuset.cpus`) as [`CpusetCount`],
//! - pressure stall information (`*.pressure`) through [`parse_psi`].
//!
//! ```rust
//! use cgroup_stats::cgroup::parse::{Limit, SingleLineStat};
//!
//! let limit = Limit::from_reader(&mut "max\n".as_bytes()).unwrap();
//! assert_eq!(limit.0, None);
//! ```

use std::io::BufRead;

use super::{SingleLineStat, StatParseError};
use crate::cgroup::stats::PsiStats;

/// Smallest value cgroup v1 reports for "no limit" (`PAGE_COUNTER_MAX` rounded to pages).
pub const V1_UNLIMITED: u64 = 0x7FFF_FFFF_FFFF_F000;

/// Default CFS period in microseconds when `cpu.max` omits it.
const DEFAULT_PERIOD: u64 = 100_000;

fn invalid_value(value: &str, source: std::num::ParseIntError) -> std::io::Error {
    StatParseError::InvalidValue {
        value: value.to_string(),
        line: 1,
        source,
    }
    .into()
}

/// A single unsigned counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter(pub u64);

impl SingleLineStat for Counter {
    fn parse_value(value: &str) -> std::io::Result<Self> {
        value
            .parse::<u64>()
            .map(Counter)
            .map_err(|source| invalid_value(value, source))
    }
}

/// A limit, `None` when unlimited.
///
/// Recognizes `max` (v2), `-1` (v1 CFS quota and some v1 limits) and values at or above
/// [`V1_UNLIMITED`] (v1 memory limits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub Option<u64>);

impl Limit {
    /// Parses a limit token that is not necessarily a whole line, e.g. `max` in `rbps=max`.
    pub fn parse_token(value: &str) -> Result<Option<u64>, std::num::ParseIntError> {
        match value {
            "max" | "-1" => Ok(None),
            value => value
                .parse::<u64>()
                .map(|v| (v < V1_UNLIMITED).then_some(v)),
        }
    }
}

impl SingleLineStat for Limit {
    fn parse_value(value: &str) -> std::io::Result<Self> {
        Self::parse_token(value)
            .map(Limit)
            .map_err(|source| invalid_value(value, source))
    }
}

/// CFS bandwidth from `cpu.max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuMax {
    /// Maximum CPU time in microseconds per period, `None` when unlimited.
    pub quota: Option<u64>,
    /// Enforcement period in microseconds.
    pub period: u64,
}

impl Default for CpuMax {
    fn default() -> Self {
        Self {
            quota: None,
            period: DEFAULT_PERIOD,
        }
    }
}

impl SingleLineStat for CpuMax {
    fn parse_value(value: &str) -> std::io::Result<Self> {
        let mut parts = value.split_whitespace();
        let quota = match parts.next() {
            Some(quota) => Limit::parse_token(quota).map_err(|source| invalid_value(quota, source))?,
            None => None,
        };
        let period = match parts.next() {
            Some(period) => period
                .parse::<u64>()
                .map_err(|source| invalid_value(period, source))?,
            None => DEFAULT_PERIOD,
        };

        Ok(CpuMax { quota, period })
    }
}

/// Number of CPUs in a cpuset list such as `0-3,8,10-11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpusetCount(pub u64);

impl SingleLineStat for CpusetCount {
    fn parse_value(value: &str) -> std::io::Result<Self> {
        let mut count: u64 = 0;
        for range in value.split(',').filter(|r| !r.is_empty()) {
            let (start, end) = range.split_once('-').unwrap_or((range, range));
            let start = start
                .parse::<u64>()
                .map_err(|source| invalid_value(range, source))?;
            let end = end
                .parse::<u64>()
                .map_err(|source| invalid_value(range, source))?;
            count = end
                .checked_sub(start)
                .and_then(|span| span.checked_add(1))
                .and_then(|cpus| count.checked_add(cpus))
                .ok_or_else(|| StatParseError::InvalidLine {
                    content: value.to_string(),
                    line: 1,
                })?;
        }

        Ok(CpusetCount(count))
    }
}

/// Parses a `*.pressure` file into its `some` and `full` lines.
///
/// Lines look like `some avg10=0.12 avg60=0.05 avg300=0.01 total=123456`. A kernel
/// without PSI-full accounting for a resource (`cpu.pressure` before 5.13) simply has no
/// `full` line.
///
/// # Errors
///
/// Returns a wrapped [`StatParseError`] for unknown line prefixes or malformed values.
pub fn parse_psi<R: BufRead>(buf: &mut R) -> std::io::Result<(Option<PsiStats>, Option<PsiStats>)> {
    let mut some = None;
    let mut full = None;

    let mut line = String::new();
    let mut lineno = 0;
    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        let mut parts = line.split_whitespace();
        let target = match parts.next() {
            Some("some") => &mut some,
            Some("full") => &mut full,
            None => {
                line.clear();
                continue;
            }
            Some(_) => {
                return Err(StatParseError::InvalidLine {
                    content: line.trim_end().to_string(),
                    line: lineno,
                }
                .into());
            }
        };

        let mut psi = PsiStats::default();
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let decimal = |v: &str| {
                v.parse::<f64>()
                    .map_err(|source| StatParseError::InvalidDecimal {
                        key: key.to_string(),
                        value: v.to_string(),
                        line: lineno,
                        source,
                    })
            };
            match key {
                "avg10" => psi.avg10 = Some(decimal(value)?),
                "avg60" => psi.avg60 = Some(decimal(value)?),
                "avg300" => psi.avg300 = Some(decimal(value)?),
                "total" => {
                    psi.total = Some(value.parse::<u64>().map_err(|source| {
                        StatParseError::InvalidKeyValue {
                            key: key.to_string(),
                            value: value.to_string(),
                            line: lineno,
                            source,
                        }
                    })?)
                }
                _ => {}
            }
        }
        *target = Some(psi);

        line.clear();
    }

    Ok((some, full))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::parse::extract_stat_parse_error;

    #[test]
    fn test_counter() {
        let counter = Counter::from_reader(&mut "536870912\n".as_bytes()).unwrap();
        assert_eq!(counter, Counter(536_870_912));
    }

    #[test]
    fn test_empty_counter() {
        let err = Counter::from_reader(&mut "".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidValue { value, line, .. } => {
                assert_eq!(value, "");
                assert_eq!(*line, 1);
            }
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_limit() {
        assert_eq!(Limit::from_reader(&mut "max\n".as_bytes()).unwrap(), Limit(None));
        assert_eq!(Limit::from_reader(&mut "-1\n".as_bytes()).unwrap(), Limit(None));
        assert_eq!(
            Limit::from_reader(&mut "9223372036854771712\n".as_bytes()).unwrap(),
            Limit(None)
        );
        assert_eq!(
            Limit::from_reader(&mut "104857600\n".as_bytes()).unwrap(),
            Limit(Some(104_857_600))
        );
    }

    #[test]
    fn test_invalid_limit() {
        let err = Limit::from_reader(&mut "abc\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_cpu_max() {
        let limit = CpuMax::from_reader(&mut "50000 100000\n".as_bytes()).unwrap();
        assert_eq!(limit.quota, Some(50_000));
        assert_eq!(limit.period, 100_000);

        let limit = CpuMax::from_reader(&mut "max 250000".as_bytes()).unwrap();
        assert_eq!(limit.quota, None);
        assert_eq!(limit.period, 250_000);

        let limit = CpuMax::from_reader(&mut "max".as_bytes()).unwrap();
        assert_eq!(limit, CpuMax::default());
    }

    #[test]
    fn test_cpuset_count() {
        let count = CpusetCount::from_reader(&mut "0-3,8,10-11\n".as_bytes()).unwrap();
        assert_eq!(count, CpusetCount(7));

        let count = CpusetCount::from_reader(&mut "\n".as_bytes()).unwrap();
        assert_eq!(count, CpusetCount(0));

        for invalid in ["3-1", "0-18446744073709551615", "0-18446744073709551614,0"] {
            let err = CpusetCount::from_reader(&mut invalid.as_bytes()).unwrap_err();
            assert!(
                matches!(extract_stat_parse_error(&err), StatParseError::InvalidLine { .. }),
                "{invalid} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_psi() {
        let data = "\
some avg10=1.50 avg60=0.75 avg300=0.10 total=123456
full avg10=0.00 avg60=0.00 avg300=0.00 total=42
";
        let (some, full) = parse_psi(&mut data.as_bytes()).unwrap();
        let some = some.unwrap();
        assert_eq!(some.avg10, Some(1.5));
        assert_eq!(some.avg60, Some(0.75));
        assert_eq!(some.avg300, Some(0.1));
        assert_eq!(some.total, Some(123_456));
        assert_eq!(full.unwrap().total, Some(42));
    }

    #[test]
    fn test_parse_psi_without_full_line() {
        let data = "some avg10=0.00 avg60=0.00 avg300=0.00 total=0\n";
        let (some, full) = parse_psi(&mut data.as_bytes()).unwrap();
        assert!(some.is_some());
        assert!(full.is_none());
    }

    #[test]
    fn test_parse_invalid_psi() {
        let data = "some avg10=fast avg60=0.00 avg300=0.00 total=0\n";
        let err = parse_psi(&mut data.as_bytes()).unwrap_err();
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidDecimal { key, value, .. } => {
                assert_eq!(key, "avg10");
                assert_eq!(value, "fast");
            }
            _ => panic!("Expected InvalidDecimal error"),
        }

        let err = parse_psi(&mut "partial avg10=0.00\n".as_bytes()).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::InvalidLine { line: 1, .. }
        ));
    }
}
