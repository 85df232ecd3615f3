use std::collections::HashMap;
use std::sync::LazyLock;

use super::ControllerDirs;
use crate::cgroup::parse::{Counter, Handlers, KeyValueStat, Limit, SingleLineStat};
use crate::cgroup::read;
use crate::cgroup::stats::MemoryStats;
use crate::error::{Error, Result};

/// v1 `memory.stat`. Only the local counters are kept, the `total_*` ones include
/// descendants.
#[derive(Debug, Default)]
struct MemoryStatFile(MemoryStats);

static STAT_HANDLERS: LazyLock<Handlers<MemoryStatFile>> = LazyLock::new(|| {
    let mut m: Handlers<MemoryStatFile> = HashMap::with_capacity(13);

    m.insert("cache", |s, v| s.0.cache = Some(v));
    m.insert("rss", |s, v| s.0.rss = Some(v));
    m.insert("rss_huge", |s, v| s.0.rss_huge = Some(v));
    m.insert("shmem", |s, v| s.0.shmem = Some(v));
    m.insert("mapped_file", |s, v| s.0.mapped_file = Some(v));
    m.insert("swap", |s, v| s.0.swap = Some(v));
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

/// `memory.oom_control`; only the kill counter is a statistic.
#[derive(Debug, Default)]
struct OomControl(MemoryStats);

static OOM_HANDLERS: LazyLock<Handlers<OomControl>> = LazyLock::new(|| {
    let mut m: Handlers<OomControl> = HashMap::with_capacity(1);
    m.insert("oom_kill", |s, v| s.0.oom_kill_events = Some(v));
    m
});

impl KeyValueStat for OomControl {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static Handlers<Self> {
        &OOM_HANDLERS
    }
}

/// Reads the memory stats of a v1 cgroup; `memory.usage_in_bytes` is required.
pub(super) fn read_memory_stats(dirs: &ControllerDirs<'_>) -> Result<MemoryStats> {
    let dir = dirs.get("memory").ok_or(Error::ControllerNotFound {
        controller: "memory",
    })?;
    let Counter(usage) =
        read::read_required(&dir.join("memory.usage_in_bytes"), Counter::from_reader)?;

    let mut stats = MemoryStats::default();
    if let Some(MemoryStatFile(stat)) =
        read::read_optional(&dir.join("memory.stat"), MemoryStatFile::from_reader)
    {
        stats.merge(stat);
    }
    if let Some(OomControl(oom)) =
        read::read_optional(&dir.join("memory.oom_control"), OomControl::from_reader)
    {
        stats.merge(oom);
    }

    let limit = |name: &str| {
        read::read_optional(&dir.join(name), Limit::from_reader).and_then(|Limit(limit)| limit)
    };
    stats.limit = limit("memory.limit_in_bytes");
    stats.low_threshold = limit("memory.soft_limit_in_bytes");
    stats.swap_limit = limit("memory.memsw.limit_in_bytes");

    let counter = |name: &str| read::read_optional(&dir.join(name), Counter::from_reader).map(|c| c.0);
    stats.peak = counter("memory.max_usage_in_bytes");
    stats.failcnt = counter("memory.failcnt");
    stats.kernel_memory = counter("memory.kmem.usage_in_bytes");

    stats.usage_total = Some(usage);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::cgroup::testutil::write_files;

    const MEMORY_STAT: &str = "\
cache 2097152
rss 1048576
rss_huge 0
shmem 0
mapped_file 4096
dirty 0
writeback 0
swap 512
pgpgin 100
pgpgout 50
pgfault 200
pgmajfault 3
inactive_anon 10
active_anon 20
inactive_file 30
active_file 40
unevictable 0
hierarchical_memory_limit 9223372036854771712
total_cache 2097152
total_rss 1048576
";

    #[test]
    fn test_read_memory_stats() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("memory/docker/abc");
        std::fs::create_dir_all(&dir).unwrap();
        write_files(
            &dir,
            &[
                ("memory.usage_in_bytes", "3145728\n"),
                ("memory.stat", MEMORY_STAT),
                ("memory.limit_in_bytes", "9223372036854771712\n"),
                ("memory.soft_limit_in_bytes", "1048576\n"),
                ("memory.max_usage_in_bytes", "4194304\n"),
                ("memory.failcnt", "7\n"),
                ("memory.kmem.usage_in_bytes", "65536\n"),
                ("memory.oom_control", "oom_kill_disable 0\nunder_oom 0\noom_kill 2\n"),
            ],
        );
        let mounts = BTreeMap::from([("memory".to_owned(), root.path().join("memory"))]);

        let dirs = ControllerDirs::new(&mounts, Path::new("docker/abc"));
        let stats = read_memory_stats(&dirs).unwrap();
        assert_eq!(stats.usage_total, Some(3_145_728));
        assert_eq!(stats.cache, Some(2_097_152));
        assert_eq!(stats.rss, Some(1_048_576));
        assert_eq!(stats.swap, Some(512));
        assert_eq!(stats.limit, None);
        assert_eq!(stats.low_threshold, Some(1_048_576));
        assert_eq!(stats.swap_limit, None);
        assert_eq!(stats.peak, Some(4_194_304));
        assert_eq!(stats.failcnt, Some(7));
        assert_eq!(stats.kernel_memory, Some(65_536));
        assert_eq!(stats.oom_kill_events, Some(2));
        assert_eq!(stats.oom_events, None);
        assert_eq!(stats.high_threshold, None);
    }

    #[test]
    fn test_memory_not_mounted() {
        let mounts: BTreeMap<String, PathBuf> = BTreeMap::new();
        let dirs = ControllerDirs::new(&mounts, Path::new(""));
        let err = read_memory_stats(&dirs).unwrap_err();
        assert!(matches!(err, Error::ControllerNotFound { controller: "memory" }));
    }
}
