//! [`Cgroup`] implementation for the unified (v2) hierarchy.
//!
//! All controllers share one directory per cgroup below the `cgroup2` mount point, and
//! every call re-reads the interface files of that directory.

mod cpu;
mod io;
mod memory;
mod pid;

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::pids::{Membership, PidLister, PidSource};
use super::stats::{CpuStats, IoStats, MemoryStats, PidStats};
use super::Cgroup;
use crate::error::{Error, Result};
use crate::fsutil;

/// A cgroup on the unified hierarchy.
#[derive(Debug)]
pub struct CgroupV2 {
    identifier: String,
    mount: PathBuf,
    relative_path: PathBuf,
    dir: PathBuf,
    inode: u64,
    pids: PidLister,
}

impl CgroupV2 {
    /// Opens the cgroup at `relative_path` below the `cgroup2` mount point `mount`.
    ///
    /// The inode is resolved here, once; an empty relative path is the root cgroup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileSystem`] if the cgroup directory does not exist (anymore).
    pub fn new(
        identifier: impl Into<String>,
        mount: impl Into<PathBuf>,
        relative_path: impl AsRef<Path>,
        pid_source: PidSource,
    ) -> Result<Self> {
        let mount = mount.into();
        let relative_path = relative(relative_path.as_ref());
        let dir = mount.join(&relative_path);
        let inode = fsutil::inode_of(&dir).map_err(|source| Error::FileSystem {
            path: dir.clone(),
            source,
        })?;
        let pids = PidLister::new(pid_source, dir.clone(), Membership::unified(&relative_path));

        Ok(Self {
            identifier: identifier.into(),
            mount,
            relative_path,
            dir,
            inode,
            pids,
        })
    }

    /// The cgroup directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// The cgroup path relative to the mount point, empty for the root cgroup.
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

/// Strips leading separators so the path can be joined below a mount point.
pub(super) fn relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .collect()
}

/// The identifier of a parent cgroup: its last path segment, empty for the root.
pub(super) fn parent_identifier(relative_path: &Path) -> String {
    relative_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Cgroup for CgroupV2 {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn inode(&self) -> u64 {
        self.inode
    }

    fn parent(&self) -> Result<Box<dyn Cgroup>> {
        let parent = self
            .relative_path
            .parent()
            .ok_or_else(|| Error::ParentNotFound {
                identifier: self.identifier.clone(),
            })?;

        let source = self.pids.source().clone();
        let cgroup = CgroupV2::new(parent_identifier(parent), self.mount.clone(), parent, source)?;
        Ok(Box::new(cgroup))
    }

    fn cpu_stats(&self, stats: &mut CpuStats) -> Result<()> {
        stats.merge(cpu::read_cpu_stats(&self.dir)?);
        Ok(())
    }

    fn memory_stats(&self, stats: &mut MemoryStats) -> Result<()> {
        stats.merge(memory::read_memory_stats(&self.dir)?);
        Ok(())
    }

    fn io_stats(&self, stats: &mut IoStats) -> Result<()> {
        stats.merge(io::read_io_stats(&self.dir)?);
        Ok(())
    }

    fn pid_stats(&self, stats: &mut PidStats) -> Result<()> {
        stats.merge(pid::read_pid_stats(&self.dir)?);
        Ok(())
    }

    fn pids(&self, cache_validity: Duration) -> Result<Vec<i32>> {
        self.pids.list(&self.identifier, cache_validity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::testutil::write_files;
    use crate::cgroup::{Stats, get_stats};

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let mount = tempfile::tempdir().unwrap();
        let dir = mount.path().join("system.slice/docker-abc.scope");
        std::fs::create_dir_all(&dir).unwrap();
        write_files(
            &dir,
            &[
                ("cpu.stat", "usage_usec 100\nuser_usec 60\nsystem_usec 40\n"),
                ("memory.current", "4096\n"),
                ("io.stat", "8:0 rbytes=1 wbytes=2 rios=3 wios=4\n"),
                ("pids.current", "2\n"),
                ("cgroup.procs", "10\n11\n"),
            ],
        );
        (mount, dir)
    }

    #[test]
    fn test_stats_of_container() {
        let (mount, _) = fixture();
        let cgroup = CgroupV2::new(
            "docker-abc.scope",
            mount.path(),
            "/system.slice/docker-abc.scope",
            PidSource::CgroupProcs,
        )
        .unwrap();

        let mut stats = Stats::default();
        let (all_failed, errs) = get_stats(&cgroup, Some(&mut stats));
        assert!(!all_failed);
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(stats.cpu.unwrap().total, Some(100_000));
        assert_eq!(stats.memory.unwrap().usage_total, Some(4096));
        assert_eq!(stats.io.unwrap().write_operations, Some(4));
        assert_eq!(stats.pid.unwrap().hierarchical_thread_count, Some(2));
        assert_eq!(cgroup.pids(Duration::ZERO).unwrap(), vec![10, 11]);
    }

    #[test]
    fn test_inode_and_parent() {
        let (mount, dir) = fixture();
        let cgroup = CgroupV2::new(
            "docker-abc.scope",
            mount.path(),
            "system.slice/docker-abc.scope",
            PidSource::CgroupProcs,
        )
        .unwrap();
        assert_eq!(cgroup.identifier(), "docker-abc.scope");
        assert_eq!(cgroup.inode(), fsutil::inode_of(&dir).unwrap());
        assert_eq!(cgroup.path(), dir);

        let parent = cgroup.parent().unwrap();
        assert_eq!(parent.identifier(), "system.slice");
        assert_eq!(
            parent.inode(),
            fsutil::inode_of(mount.path().join("system.slice")).unwrap()
        );

        let root = parent.parent().unwrap();
        assert_eq!(root.identifier(), "");
        assert_eq!(root.inode(), fsutil::inode_of(mount.path()).unwrap());

        let err = root.parent().unwrap_err();
        assert!(matches!(err, Error::ParentNotFound { .. }));
    }

    #[test]
    fn test_parent_removed() {
        let (mount, _) = fixture();
        let cgroup = CgroupV2::new(
            "docker-abc.scope",
            mount.path(),
            "system.slice/docker-abc.scope",
            PidSource::CgroupProcs,
        )
        .unwrap();
        std::fs::remove_dir_all(mount.path().join("system.slice")).unwrap();

        let err = cgroup.parent().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_cgroup() {
        let mount = tempfile::tempdir().unwrap();
        let err = CgroupV2::new("gone", mount.path(), "gone", PidSource::CgroupProcs).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_removed_cgroup_fails_every_domain() {
        let (mount, dir) = fixture();
        let cgroup = CgroupV2::new(
            "docker-abc.scope",
            mount.path(),
            "system.slice/docker-abc.scope",
            PidSource::CgroupProcs,
        )
        .unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        let mut stats = Stats::default();
        let (all_failed, errs) = get_stats(&cgroup, Some(&mut stats));
        assert!(all_failed);
        assert_eq!(errs.len(), 4);
        assert_eq!(stats, Stats::default());
        assert!(cgroup.pids(Duration::ZERO).is_err());
    }
}
