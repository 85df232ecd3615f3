use super::ControllerDirs;
use crate::cgroup::parse::{Counter, Limit, SingleLineStat};
use crate::cgroup::read;
use crate::cgroup::stats::PidStats;
use crate::error::{Error, Result};

/// Reads `pids.current` and `pids.max` of the v1 `pids` controller.
pub(super) fn read_pid_stats(dirs: &ControllerDirs<'_>) -> Result<PidStats> {
    let dir = dirs.get("pids").ok_or(Error::ControllerNotFound {
        controller: "pids",
    })?;
    let Counter(current) = read::read_required(&dir.join("pids.current"), Counter::from_reader)?;
    let limit = read::read_optional(&dir.join("pids.max"), Limit::from_reader).and_then(|l| l.0);

    Ok(PidStats {
        hierarchical_thread_count: Some(current),
        hierarchical_thread_limit: limit,
    })
}
