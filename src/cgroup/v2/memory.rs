//! Memory accounting on the unified hierarchy.
//!
//! `memory.current` only exists when the `memory` controller is enabled for the cgroup,
//! which makes it the marker file of the domain. Everything else is best effort: some
//! files are missing on the root cgroup (`memory.max`, `memory.events`) or on older
//! kernels (`memory.peak`, `memory.pressure`).

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::cgroup::parse::{Counter, Handlers, KeyValueStat, Limit, SingleLineStat, parse_psi};
use crate::cgroup::read;
use crate::cgroup::stats::MemoryStats;
use crate::error::Result;

/// `memory.stat` with the v2 names (`anon`, `file`, ...) mapped onto [`MemoryStats`].
#[derive(Debug, Default)]
struct MemoryStatFile(MemoryStats);

static STAT_HANDLERS: LazyLock<Handlers<MemoryStatFile>> = LazyLock::new(|| {
    let mut m: Handlers<MemoryStatFile> = HashMap::with_capacity(14);

    m.insert("anon", |s, v| s.0.rss = Some(v));
    m.insert("file", |s, v| s.0.cache = Some(v));
    m.insert("anon_thp", |s, v| s.0.rss_huge = Some(v));
    m.insert("shmem", |s, v| s.0.shmem = Some(v));
    m.insert("file_mapped", |s, v| s.0.mapped_file = Some(v));
    m.insert("kernel_stack", |s, v| s.0.kernel_memory = Some(v));
    m.insert("slab", |s, v| s.0.slab = Some(v));
    m.insert("pgfault", |s, v| s.0.pgfault = Some(v));
    m.insert("pgmajfault", |s, v| s.0.pgmajfault = Some(v));
    m.insert("active_anon", |s, v| s.0.active_anon = Some(v));
    m.insert("inactive_anon", |s, v| s.0.inactive_anon = Some(v));
    m.insert("active_file", |s, v| s.0.active_file = Some(v));
    m.insert("inactive_file", |s, v| s.0.inactive_file = Some(v));
    m.insert("unevictable", |s, v| s.0.unevictable = Some(v));

    m
});

impl KeyValueStat for MemoryStatFile {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static Handlers<Self> {
        &STAT_HANDLERS
    }
}

/// The OOM counters of `memory.events`.
#[derive(Debug, Default)]
struct MemoryEvents(MemoryStats);

static EVENT_HANDLERS: LazyLock<Handlers<MemoryEvents>> = LazyLock::new(|| {
    let mut m: Handlers<MemoryEvents> = HashMap::with_capacity(2);
    m.insert("oom", |s, v| s.0.oom_events = Some(v));
    m.insert("oom_kill", |s, v| s.0.oom_kill_events = Some(v));
    m
});

impl KeyValueStat for MemoryEvents {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static Handlers<Self> {
        &EVENT_HANDLERS
    }
}

/// Reads the memory stats of the cgroup directory `dir`.
pub(super) fn read_memory_stats(dir: &Path) -> Result<MemoryStats> {
    let Counter(usage) =
        read::read_controller_file(&dir.join("memory.current"), "memory", Counter::from_reader)?;

    let mut stats = MemoryStats::default();
    if let Some(MemoryStatFile(stat)) =
        read::read_optional(&dir.join("memory.stat"), MemoryStatFile::from_reader)
    {
        stats.merge(stat);
    }
    if let Some(MemoryEvents(events)) =
        read::read_optional(&dir.join("memory.events"), MemoryEvents::from_reader)
    {
        stats.merge(events);
    }

    let limit = |name: &str| {
        read::read_optional(&dir.join(name), Limit::from_reader).and_then(|Limit(limit)| limit)
    };
    stats.limit = limit("memory.max");
    stats.high_threshold = limit("memory.high");
    stats.low_threshold = limit("memory.low");
    stats.min_threshold = limit("memory.min");
    stats.swap_limit = limit("memory.swap.max");

    let counter = |name: &str| read::read_optional(&dir.join(name), Counter::from_reader).map(|c| c.0);
    stats.swap = counter("memory.swap.current");
    stats.peak = counter("memory.peak");

    if let Some((some, full)) = read::read_optional(&dir.join("memory.pressure"), parse_psi) {
        stats.psi_some = some;
        stats.psi_full = full;
    }

    stats.usage_total = Some(usage);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::testutil::write_files;
    use crate::error::Error;

    const MEMORY_STAT: &str = "\
anon 1048576
file 2097152
kernel 3145728
kernel_stack 65536
pagetables 0
sec_pagetables 0
percpu 0
sock 0
vmalloc 0
shmem 4096
file_mapped 8192
file_dirty 0
file_writeback 0
swapcached 0
anon_thp 0
inactive_anon 1000
active_anon 2000
inactive_file 3000
active_file 4000
unevictable 0
slab 16384
pgfault 100
pgmajfault 5
";

    #[test]
    fn test_parse_memory_stat() {
        let MemoryStatFile(stats) = MemoryStatFile::from_reader(&mut MEMORY_STAT.as_bytes()).unwrap();
        assert_eq!(stats.rss, Some(1_048_576));
        assert_eq!(stats.cache, Some(2_097_152));
        assert_eq!(stats.kernel_memory, Some(65_536));
        assert_eq!(stats.shmem, Some(4096));
        assert_eq!(stats.mapped_file, Some(8192));
        assert_eq!(stats.rss_huge, Some(0));
        assert_eq!(stats.active_file, Some(4000));
        assert_eq!(stats.slab, Some(16_384));
        assert_eq!(stats.pgmajfault, Some(5));
        assert_eq!(stats.swap, None);
    }

    #[test]
    fn test_read_memory_stats() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("memory.current", "4194304\n"),
                ("memory.stat", MEMORY_STAT),
                ("memory.events", "low 0\nhigh 3\nmax 7\noom 2\noom_kill 1\noom_group_kill 0\n"),
                ("memory.max", "104857600\n"),
                ("memory.high", "max\n"),
                ("memory.low", "0\n"),
                ("memory.swap.current", "0\n"),
                ("memory.swap.max", "max\n"),
                ("memory.peak", "5242880\n"),
            ],
        );

        let stats = read_memory_stats(dir.path()).unwrap();
        assert_eq!(stats.usage_total, Some(4_194_304));
        assert_eq!(stats.rss, Some(1_048_576));
        assert_eq!(stats.limit, Some(104_857_600));
        assert_eq!(stats.high_threshold, None);
        assert_eq!(stats.low_threshold, Some(0));
        assert_eq!(stats.min_threshold, None);
        assert_eq!(stats.swap, Some(0));
        assert_eq!(stats.swap_limit, None);
        assert_eq!(stats.peak, Some(5_242_880));
        assert_eq!(stats.oom_events, Some(2));
        assert_eq!(stats.oom_kill_events, Some(1));
        assert_eq!(stats.failcnt, None);
        assert!(stats.psi_some.is_none());
    }

    #[test]
    fn test_memory_controller_disabled() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("memory.stat", MEMORY_STAT)]);

        let err = read_memory_stats(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ControllerNotFound { controller: "memory" }));
    }

    #[test]
    fn test_malformed_usage() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("memory.current", "a lot\n")]);

        let err = read_memory_stats(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Value { .. }));
    }
}
