//! Version-agnostic access to cgroup resource accounting.
//!
//! A [`Cgroup`] is one node of a cgroup hierarchy. It exposes its identity, its parent and
//! four independent stat domains (CPU, memory, I/O, PIDs), plus the list of processes it
//! contains. [`CgroupV1`] and [`CgroupV2`] hide the on-disk layout of both cgroup
//! versions; callers never branch on the version.
//!
//! [`get_stats`] drives the four domains against one cgroup and merges them into a
//! [`Stats`] snapshot. A failing domain never aborts the others.
//!
//! # Key Components
//!
//! - [`Cgroup`]: the capability set every cgroup implementation provides.
//! - [`Hierarchy`]: detects the host layout and opens cgroups by relative path.
//! - [`get_stats`]: best-effort aggregation into a [`Stats`] snapshot.
//! - [`parse`]: the stat file parsers shared by both versions.
//!
//! # Example
//!
//! ```no_run
//! use cgroup_stats::cgroup::{Hierarchy, Stats, get_stats};
//! use cgroup_stats::Config;
//!
//! let hierarchy = Hierarchy::detect(&Config::from_env())?;
//! let cgroup = hierarchy.cgroup("docker-abc.scope", "system.slice/docker-abc.scope")?;
//!
//! let mut stats = Stats::default();
//! let (all_failed, errs) = get_stats(cgroup.as_ref(), Some(&mut stats));
//! # Ok::<(), cgroup_stats::Error>(())
//! ```
mod hierarchy;
pub mod parse;
mod pids;
mod read;
pub mod stats;
mod v1;
mod v2;

pub use hierarchy::Hierarchy;
pub use pids::PidSource;
pub use stats::{CpuStats, DeviceIoStats, IoStats, MemoryStats, PidStats, PsiStats, Stats};
pub use v1::CgroupV1;
pub use v2::CgroupV2;

use std::time::Duration;

use crate::error::{Error, Result};

/// One node of a cgroup hierarchy.
///
/// Stat getters re-read the filesystem on every call and fill `stats` in place. On
/// failure `stats` is left exactly as it was: fields set by an earlier call stay visible.
pub trait Cgroup: std::fmt::Debug + Send + Sync {
    /// The identity assigned when the cgroup was opened, usually its directory name.
    fn identifier(&self) -> &str;

    /// The inode of the cgroup directory, resolved when the cgroup was opened.
    fn inode(&self) -> u64;

    /// Opens the parent cgroup as a new, independently owned instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParentNotFound`] for the root cgroup and [`Error::FileSystem`] if
    /// the parent was removed in the meantime.
    fn parent(&self) -> Result<Box<dyn Cgroup>>;

    fn cpu_stats(&self, stats: &mut CpuStats) -> Result<()>;

    fn memory_stats(&self, stats: &mut MemoryStats) -> Result<()>;

    fn io_stats(&self, stats: &mut IoStats) -> Result<()>;

    fn pid_stats(&self, stats: &mut PidStats) -> Result<()>;

    /// Returns the processes currently in the cgroup.
    ///
    /// When PIDs have to be enumerated across PID namespaces, a list younger than
    /// `cache_validity` may be returned instead of a fresh one. From the host namespace
    /// every call reads live data and `cache_validity` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PidEnumeration`] if the process list cannot be read, e.g. because
    /// the cgroup was removed.
    fn pids(&self, cache_validity: Duration) -> Result<Vec<i32>>;
}

/// Reads one domain into a fresh record and stores it in `slot` on success.
fn collect<T: Default>(
    slot: &mut Option<T>,
    errs: &mut Vec<Error>,
    (identifier, domain): (&str, &str),
    read: impl FnOnce(&mut T) -> Result<()>,
) -> bool {
    let mut record = T::default();
    match read(&mut record) {
        Ok(()) => {
            *slot = Some(record);
            true
        }
        Err(err) => {
            log::debug!(
                target: "cgroup stats",
                "failed reading {domain} stats: cgroup={identifier}, error={err}"
            );
            errs.push(err);
            false
        }
    }
}

/// Collects the CPU, memory, I/O and PID stats of `cgroup` into `stats`, in that order.
///
/// Each domain is read into a fresh record that replaces the matching field of `stats`
/// only on success; a failed domain leaves its field untouched. The returned errors hold
/// one entry per failed domain, in collection order, and `all_failed` is `true` only if
/// no domain succeeded.
///
/// Passing `None` returns `(true, [Error::InvalidInput])` without touching `cgroup`.
pub fn get_stats<C: Cgroup + ?Sized>(cgroup: &C, stats: Option<&mut Stats>) -> (bool, Vec<Error>) {
    let Some(stats) = stats else {
        return (
            true,
            vec![Error::InvalidInput {
                desc: "no stats target to fill".to_owned(),
            }],
        );
    };

    let id = cgroup.identifier();
    let mut errs = Vec::new();
    let mut succeeded = false;
    succeeded |= collect(&mut stats.cpu, &mut errs, (id, "cpu"), |s| cgroup.cpu_stats(s));
    succeeded |= collect(&mut stats.memory, &mut errs, (id, "memory"), |s| {
        cgroup.memory_stats(s)
    });
    succeeded |= collect(&mut stats.io, &mut errs, (id, "io"), |s| cgroup.io_stats(s));
    succeeded |= collect(&mut stats.pid, &mut errs, (id, "pid"), |s| cgroup.pid_stats(s));

    (!succeeded, errs)
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// A cgroup whose domains succeed or fail on demand.
    #[derive(Debug, Default)]
    struct FakeCgroup {
        fail_cpu: bool,
        fail_memory: bool,
        fail_io: bool,
        fail_pid: bool,
        calls: AtomicUsize,
    }

    impl FakeCgroup {
        fn failing(cpu: bool, memory: bool, io: bool, pid: bool) -> Self {
            Self {
                fail_cpu: cpu,
                fail_memory: memory,
                fail_io: io,
                fail_pid: pid,
                ..Default::default()
            }
        }

        fn outcome(&self, fail: bool, controller: &'static str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if fail {
                Err(Error::ControllerNotFound { controller })
            } else {
                Ok(())
            }
        }
    }

    impl Cgroup for FakeCgroup {
        fn identifier(&self) -> &str {
            "fake"
        }

        fn inode(&self) -> u64 {
            1
        }

        fn parent(&self) -> Result<Box<dyn Cgroup>> {
            Err(Error::ParentNotFound {
                identifier: "fake".to_owned(),
            })
        }

        fn cpu_stats(&self, stats: &mut CpuStats) -> Result<()> {
            // A failing reader may scribble on its scratch record before bailing out.
            stats.total = Some(1);
            self.outcome(self.fail_cpu, "cpu")?;
            stats.user = Some(2);
            Ok(())
        }

        fn memory_stats(&self, stats: &mut MemoryStats) -> Result<()> {
            stats.usage_total = Some(3);
            self.outcome(self.fail_memory, "memory")
        }

        fn io_stats(&self, stats: &mut IoStats) -> Result<()> {
            stats.read_bytes = Some(4);
            self.outcome(self.fail_io, "io")
        }

        fn pid_stats(&self, stats: &mut PidStats) -> Result<()> {
            stats.hierarchical_thread_count = Some(5);
            self.outcome(self.fail_pid, "pids")
        }

        fn pids(&self, _cache_validity: Duration) -> Result<Vec<i32>> {
            Ok(vec![1])
        }
    }

    fn controllers(errs: &[Error]) -> Vec<&'static str> {
        errs.iter()
            .map(|err| match err {
                Error::ControllerNotFound { controller } => *controller,
                other => panic!("unexpected error: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_missing_target() {
        let cgroup = FakeCgroup::default();
        let (all_failed, errs) = get_stats(&cgroup, None);
        assert!(all_failed);
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], Error::InvalidInput { .. }));
        assert_eq!(cgroup.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_succeed() {
        let cgroup = FakeCgroup::default();
        let mut stats = Stats::default();
        let (all_failed, errs) = get_stats(&cgroup, Some(&mut stats));
        assert!(!all_failed);
        assert!(errs.is_empty());
        assert_eq!(stats.cpu.unwrap().user, Some(2));
        assert_eq!(stats.memory.unwrap().usage_total, Some(3));
        assert_eq!(stats.io.unwrap().read_bytes, Some(4));
        assert_eq!(stats.pid.unwrap().hierarchical_thread_count, Some(5));
    }

    #[test]
    fn test_one_failure() {
        for failing in 0..4 {
            let cgroup = FakeCgroup::failing(failing == 0, failing == 1, failing == 2, failing == 3);
            let mut stats = Stats::default();
            let (all_failed, errs) = get_stats(&cgroup, Some(&mut stats));
            assert!(!all_failed);
            assert_eq!(errs.len(), 1);
            assert_eq!(stats.cpu.is_none(), failing == 0);
            assert_eq!(stats.memory.is_none(), failing == 1);
            assert_eq!(stats.io.is_none(), failing == 2);
            assert_eq!(stats.pid.is_none(), failing == 3);
        }
    }

    #[test]
    fn test_all_fail_in_order() {
        let cgroup = FakeCgroup::failing(true, true, true, true);
        let mut stats = Stats::default();
        let (all_failed, errs) = get_stats(&cgroup, Some(&mut stats));
        assert!(all_failed);
        assert_eq!(controllers(&errs), ["cpu", "memory", "io", "pids"]);
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn test_only_memory_mounted() {
        let cgroup = FakeCgroup::failing(true, false, true, true);
        let mut stats = Stats::default();
        let (all_failed, errs) = get_stats(&cgroup, Some(&mut stats));
        assert!(!all_failed);
        assert_eq!(controllers(&errs), ["cpu", "io", "pids"]);
        assert!(stats.cpu.is_none());
        assert!(stats.io.is_none());
        assert!(stats.pid.is_none());
        assert_eq!(stats.memory.unwrap().usage_total, Some(3));
    }

    #[test]
    fn test_failed_domains_keep_previous_values() {
        let previous = Stats {
            cpu: Some(CpuStats {
                total: Some(100),
                shares: Some(1024),
                ..Default::default()
            }),
            memory: Some(MemoryStats {
                usage_total: Some(200),
                ..Default::default()
            }),
            io: Some(IoStats {
                write_bytes: Some(300),
                ..Default::default()
            }),
            pid: Some(PidStats {
                hierarchical_thread_limit: Some(400),
                ..Default::default()
            }),
        };

        let mut stats = previous.clone();
        let (all_failed, errs) = get_stats(
            &FakeCgroup::failing(true, true, true, true),
            Some(&mut stats),
        );
        assert!(all_failed);
        assert_eq!(errs.len(), 4);
        assert_eq!(stats, previous);

        let (all_failed, _) = get_stats(
            &FakeCgroup::failing(false, true, true, true),
            Some(&mut stats),
        );
        assert!(!all_failed);
        let cpu = stats.cpu.as_ref().unwrap();
        assert_eq!(cpu.total, Some(1));
        assert_eq!(cpu.shares, None, "a successful domain is replaced, not merged");
        assert_eq!(stats.memory, previous.memory);
    }

    #[test]
    fn test_trait_object() {
        let cgroup: Box<dyn Cgroup> = Box::new(FakeCgroup::default());
        let mut stats = Stats::default();
        let (all_failed, _) = get_stats(cgroup.as_ref(), Some(&mut stats));
        assert!(!all_failed);
        assert!(matches!(cgroup.parent(), Err(Error::ParentNotFound { .. })));
        assert_eq!(cgroup.pids(Duration::ZERO).unwrap(), vec![1]);
    }
}
