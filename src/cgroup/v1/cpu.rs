//! CPU accounting on v1 hierarchies.
//!
//! Usage comes from `cpuacct` (`cpuacct.usage` in nanoseconds, `cpuacct.stat` in
//! `USER_HZ` ticks), throttling and CFS settings from `cpu`, and the CPU count from
//! `cpuset`. The controllers are often co-mounted (`cpu,cpuacct`) but do not have to be.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::ControllerDirs;
use crate::cgroup::parse::{Counter, CpusetCount, Handlers, KeyValueStat, Limit, SingleLineStat};
use crate::cgroup::read;
use crate::cgroup::stats::CpuStats;
use crate::error::{Error, Result};

/// Clock ticks per second of `cpuacct.stat`, fixed by the kernel ABI.
const USER_HZ: u64 = 100;
const NS_PER_TICK: u64 = 1_000_000_000 / USER_HZ;
const NS_PER_USEC: u64 = 1_000;

/// `cpuacct.stat`: user and system time in ticks.
#[derive(Debug, Default)]
struct CpuacctStat(CpuStats);

static CPUACCT_HANDLERS: LazyLock<Handlers<CpuacctStat>> = LazyLock::new(|| {
    let mut m: Handlers<CpuacctStat> = HashMap::with_capacity(2);
    m.insert("user", |s, v| s.0.user = Some(v.saturating_mul(NS_PER_TICK)));
    m.insert("system", |s, v| s.0.system = Some(v.saturating_mul(NS_PER_TICK)));
    m
});

impl KeyValueStat for CpuacctStat {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static Handlers<Self> {
        &CPUACCT_HANDLERS
    }
}

/// `cpu.stat` of the v1 `cpu` controller: CFS throttling counters.
#[derive(Debug, Default)]
struct CpuStatFile(CpuStats);

static CPU_HANDLERS: LazyLock<Handlers<CpuStatFile>> = LazyLock::new(|| {
    let mut m: Handlers<CpuStatFile> = HashMap::with_capacity(3);
    m.insert("nr_periods", |s, v| s.0.elapsed_periods = Some(v));
    m.insert("nr_throttled", |s, v| s.0.throttled_periods = Some(v));
    m.insert("throttled_time", |s, v| s.0.throttled_time = Some(v));
    m
});

impl KeyValueStat for CpuStatFile {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static Handlers<Self> {
        &CPU_HANDLERS
    }
}

/// Reads the CPU stats of a v1 cgroup.
///
/// `cpuacct.usage` is required when `cpuacct` is mounted, otherwise `cpu.stat` is.
pub(super) fn read_cpu_stats(dirs: &ControllerDirs<'_>) -> Result<CpuStats> {
    let cpuacct = dirs.get("cpuacct");
    let cpu = dirs.get("cpu");
    if cpuacct.is_none() && cpu.is_none() {
        return Err(Error::ControllerNotFound {
            controller: "cpuacct",
        });
    }

    let mut stats = CpuStats::default();
    if let Some(dir) = &cpuacct {
        let Counter(usage) = read::read_required(&dir.join("cpuacct.usage"), Counter::from_reader)?;
        stats.total = Some(usage);
        if let Some(CpuacctStat(times)) =
            read::read_optional(&dir.join("cpuacct.stat"), CpuacctStat::from_reader)
        {
            stats.merge(times);
        }
    }

    if let Some(dir) = &cpu {
        let path = dir.join("cpu.stat");
        let throttling = if cpuacct.is_some() {
            read::read_optional(&path, CpuStatFile::from_reader)
        } else {
            Some(read::read_required(&path, CpuStatFile::from_reader)?)
        };
        if let Some(CpuStatFile(throttling)) = throttling {
            stats.merge(throttling);
        }

        let counter =
            |name: &str| read::read_optional(&dir.join(name), Counter::from_reader).map(|c| c.0);
        stats.shares = counter("cpu.shares");
        stats.scheduler_period = counter("cpu.cfs_period_us").map(|p| p.saturating_mul(NS_PER_USEC));
        stats.scheduler_quota = read::read_optional(&dir.join("cpu.cfs_quota_us"), Limit::from_reader)
            .and_then(|Limit(quota)| quota)
            .map(|q| q.saturating_mul(NS_PER_USEC));
    }

    if let Some(dir) = dirs.get("cpuset") {
        stats.cpu_count =
            read::read_optional(&dir.join("cpuset.cpus"), CpusetCount::from_reader).map(|c| c.0);
    }

    Ok(stats)
}
