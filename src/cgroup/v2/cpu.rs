//! CPU accounting on the unified hierarchy.
//!
//! `cpu.stat` is always present on v2 (it carries the base `usage_usec`/`user_usec`/
//! `system_usec` counters even without the `cpu` controller), so a missing file means the
//! cgroup itself is gone or the kernel does not account CPU at all. `cpu.max`,
//! `cpu.weight`, `cpuset.cpus.effective` and `cpu.pressure` are read on a best-effort
//! basis.
//!
//! ```text
//! usage_usec 1000000
//! user_usec 600000
//! system_usec 400000
//! nr_periods 10
//! nr_throttled 2
//! throttled_usec 50000
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::cgroup::parse::{
    Counter, CpuMax, CpusetCount, Handlers, KeyValueStat, SingleLineStat, parse_psi,
};
use crate::cgroup::read;
use crate::cgroup::stats::CpuStats;
use crate::error::Result;

const NS_PER_USEC: u64 = 1_000;

/// `cpu.stat` mapped onto [`CpuStats`], with times converted to nanoseconds.
#[derive(Debug, Default)]
struct CpuStatFile(CpuStats);

static HANDLERS: LazyLock<Handlers<CpuStatFile>> = LazyLock::new(|| {
    let mut m: Handlers<CpuStatFile> = HashMap::with_capacity(6);

    m.insert("usage_usec", |s, v| s.0.total = Some(v.saturating_mul(NS_PER_USEC)));
    m.insert("user_usec", |s, v| s.0.user = Some(v.saturating_mul(NS_PER_USEC)));
    m.insert("system_usec", |s, v| s.0.system = Some(v.saturating_mul(NS_PER_USEC)));
    m.insert("nr_periods", |s, v| s.0.elapsed_periods = Some(v));
    m.insert("nr_throttled", |s, v| s.0.throttled_periods = Some(v));
    m.insert("throttled_usec", |s, v| {
        s.0.throttled_time = Some(v.saturating_mul(NS_PER_USEC))
    });

    m
});

impl KeyValueStat for CpuStatFile {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static Handlers<Self> {
        &HANDLERS
    }
}

/// Reads the CPU stats of the cgroup directory `dir`.
pub(super) fn read_cpu_stats(dir: &Path) -> Result<CpuStats> {
    let CpuStatFile(mut stats) =
        read::read_controller_file(&dir.join("cpu.stat"), "cpu", CpuStatFile::from_reader)?;

    if let Some(max) = read::read_optional(&dir.join("cpu.max"), CpuMax::from_reader) {
        stats.scheduler_period = Some(max.period.saturating_mul(NS_PER_USEC));
        stats.scheduler_quota = max.quota.map(|quota| quota.saturating_mul(NS_PER_USEC));
    }
    stats.weight = read::read_optional(&dir.join("cpu.weight"), Counter::from_reader).map(|c| c.0);
    stats.cpu_count = read::read_optional(
        &dir.join("cpuset.cpus.effective"),
        CpusetCount::from_reader,
    )
    .map(|c| c.0);
    if let Some((some, _)) = read::read_optional(&dir.join("cpu.pressure"), parse_psi) {
        stats.psi_some = some;
    }

    Ok(stats)
}
