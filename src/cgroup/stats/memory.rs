use serde::Serialize;

use super::PsiStats;

/// Memory accounting of a cgroup, in bytes unless stated otherwise.
///
/// v1 and v2 name their counters differently (`rss` vs `anon`, `cache` vs `file`); the
/// readers map both onto these fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemoryStats {
    /// Current usage (`memory.usage_in_bytes` / `memory.current`).
    pub usage_total: Option<u64>,
    /// Page cache.
    pub cache: Option<u64>,
    /// Anonymous memory.
    pub rss: Option<u64>,
    /// Anonymous transparent huge pages.
    pub rss_huge: Option<u64>,
    /// Swap usage.
    pub swap: Option<u64>,
    /// Shared memory.
    pub shmem: Option<u64>,
    /// Memory-mapped files.
    pub mapped_file: Option<u64>,
    /// Kernel memory (v1 `kmem` usage, v2 kernel stacks).
    pub kernel_memory: Option<u64>,
    /// Slab allocations.
    pub slab: Option<u64>,
    /// Page faults (count).
    pub pgfault: Option<u64>,
    /// Major page faults (count).
    pub pgmajfault: Option<u64>,
    pub active_anon: Option<u64>,
    pub inactive_anon: Option<u64>,
    pub active_file: Option<u64>,
    pub inactive_file: Option<u64>,
    pub unevictable: Option<u64>,
    /// Hard limit, `None` when unlimited.
    pub limit: Option<u64>,
    /// Swap limit, `None` when unlimited.
    pub swap_limit: Option<u64>,
    /// Throttling threshold (`memory.high`).
    pub high_threshold: Option<u64>,
    /// Best-effort protection (`memory.low`, v1 soft limit).
    pub low_threshold: Option<u64>,
    /// Hard protection (`memory.min`).
    pub min_threshold: Option<u64>,
    /// Highest usage recorded.
    pub peak: Option<u64>,
    /// Number of times the limit was hit (v1 only).
    pub failcnt: Option<u64>,
    /// Number of times the cgroup hit its limit and an OOM was triggered.
    pub oom_events: Option<u64>,
    /// Number of processes killed by the OOM killer.
    pub oom_kill_events: Option<u64>,
    pub psi_some: Option<PsiStats>,
    pub psi_full: Option<PsiStats>,
}

impl MemoryStats {
    /// Overwrites the fields that are set in `other`.
    pub fn merge(&mut self, other: MemoryStats) {
        merge_fields!(
            self, other;
            usage_total,
            cache,
            rss,
            rss_huge,
            swap,
            shmem,
            mapped_file,
            kernel_memory,
            slab,
            pgfault,
            pgmajfault,
            active_anon,
            inactive_anon,
            active_file,
            inactive_file,
            unevictable,
            limit,
            swap_limit,
            high_threshold,
            low_threshold,
            min_threshold,
            peak,
            failcnt,
            oom_events,
            oom_kill_events,
            psi_some,
            psi_full,
        );
    }
}
