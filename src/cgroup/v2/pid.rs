use std::path::Path;

use crate::cgroup::parse::{Counter, Limit, SingleLineStat};
use crate::cgroup::read;
use crate::cgroup::stats::PidStats;
use crate::error::Result;

/// Reads the task count and limit of the cgroup directory `dir`.
pub(super) fn read_pid_stats(dir: &Path) -> Result<PidStats> {
    let Counter(current) =
        read::read_controller_file(&dir.join("pids.current"), "pids", Counter::from_reader)?;
    let limit = read::read_optional(&dir.join("pids.max"), Limit::from_reader).and_then(|l| l.0);

    Ok(PidStats {
        hierarchical_thread_count: Some(current),
        hierarchical_thread_limit: limit,
    })
}
