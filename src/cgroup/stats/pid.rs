use serde::Serialize;

/// Process and thread accounting from the `pids` controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PidStats {
    /// Number of tasks (threads) in the cgroup and its descendants, from `pids.current`.
    pub hierarchical_thread_count: Option<u64>,
    /// Task limit from `pids.max`, `None` when unlimited.
    pub hierarchical_thread_limit: Option<u64>,
}

impl PidStats {
    /// Overwrites the fields that are set in `other`.
    pub fn merge(&mut self, other: PidStats) {
        merge_fields!(self, other; hierarchical_thread_count, hierarchical_thread_limit);
    }
}
