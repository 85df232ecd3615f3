//! cgroup-stats: best-effort resource statistics for Linux cgroups.
//!
//! This library exposes a version-agnostic [`cgroup::Cgroup`] trait over cgroup v1 and
//! cgroup v2 hierarchies, reading CPU, memory, I/O and process accounting on demand, and
//! a [`cgroup::get_stats`] aggregator that merges the four resource domains into one
//! [`cgroup::Stats`] snapshot without letting one failing controller hide the others.
pub mod cgroup;
pub mod config;
pub mod environment;
pub mod error;
pub mod fsutil;
pub mod mountinfo;

pub use cgroup::{Cgroup, Hierarchy, Stats, get_stats};
pub use config::Config;
pub use error::{Error, Result};

// Reading order on the host:
//  /proc/1/mountinfo      -> cgroup2 mount (unified) and/or cgroup v1 controller mounts
//  /proc/self/ns/pid      -> compared with /proc/1/ns/pid to pick the PID source
//  <mount>/<rel>/...      -> controller files, re-read on every call
//
// When running inside a container the host root is expected under `ROOTFS_MOUNT_PATH`
// (`/` when unset), and every host path above is prefixed with it.

/// Aggregates one snapshot for the cgroup at `relative_path` on the detected hierarchy.
///
/// Per-domain failures are logged and skipped; only a failure to detect the hierarchy or
/// to open the cgroup is returned as an error. `Ok(None)` means every domain failed.
///
/// # Errors
///
/// Returns an error if the cgroup mounts cannot be detected or the cgroup directory cannot
/// be resolved.
pub fn snapshot(config: &Config, relative_path: &str) -> Result<Option<Stats>> {
    let hierarchy = Hierarchy::detect(config)?;
    log::debug!(
        "Detected cgroup {:?} hierarchy, pid source: {:?}",
        hierarchy.version(),
        hierarchy.pid_source()
    );

    let identifier = relative_path
        .rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or_default();
    let cgroup = hierarchy.cgroup(identifier, relative_path)?;

    let mut stats = Stats::default();
    let (all_failed, errs) = get_stats(cgroup.as_ref(), Some(&mut stats));
    for err in &errs {
        log::warn!(
            "failed reading cgroup stats: cgroup={}, error={}",
            cgroup.identifier(),
            err
        );
    }

    Ok((!all_failed).then_some(stats))
}
