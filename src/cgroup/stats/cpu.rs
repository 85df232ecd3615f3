use serde::Serialize;

use super::PsiStats;

/// CPU accounting of a cgroup.
///
/// Times are in nanoseconds regardless of the unit the kernel reports them in. Fields a
/// cgroup version does not expose stay `None`: `shares` only exists on v1, `weight` and
/// `psi_some` only on v2.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CpuStats {
    /// Time spent in user space.
    pub user: Option<u64>,
    /// Time spent in kernel space.
    pub system: Option<u64>,
    /// Total CPU time consumed.
    pub total: Option<u64>,
    /// Relative CPU share from `cpu.shares` (v1).
    pub shares: Option<u64>,
    /// Relative CPU weight from `cpu.weight` (v2).
    pub weight: Option<u64>,
    /// Number of enforcement periods that elapsed.
    pub elapsed_periods: Option<u64>,
    /// Number of periods in which the cgroup was throttled.
    pub throttled_periods: Option<u64>,
    /// Total time the cgroup was throttled.
    pub throttled_time: Option<u64>,
    /// Number of CPUs the cgroup may run on, from its cpuset.
    pub cpu_count: Option<u64>,
    /// CFS enforcement period.
    pub scheduler_period: Option<u64>,
    /// CFS quota per period, `None` when unlimited or unknown.
    pub scheduler_quota: Option<u64>,
    /// CPU pressure (`some` line of `cpu.pressure`).
    pub psi_some: Option<PsiStats>,
}

impl CpuStats {
    /// Overwrites the fields that are set in `other`.
    pub fn merge(&mut self, other: CpuStats) {
        merge_fields!(
            self, other;
            user,
            system,
            total,
            shares,
            weight,
            elapsed_periods,
            throttled_periods,
            throttled_time,
            cpu_count,
            scheduler_period,
            scheduler_quota,
            psi_some,
        );
    }
}
