//! [`Cgroup`] implementation for v1 hierarchies.
//!
//! Every controller has its own mount, so one cgroup is a set of directories sharing the
//! same relative path: `/sys/fs/cgroup/memory/docker/<id>`,
//! `/sys/fs/cgroup/cpu,cpuacct/docker/<id>`, ... A domain whose controller is not mounted
//! fails with [`Error::ControllerNotFound`].

mod cpu;
mod io;
mod memory;
mod pid;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::Cgroup;
use super::pids::{Membership, PidLister, PidSource};
use super::stats::{CpuStats, IoStats, MemoryStats, PidStats};
use super::v2::{parent_identifier, relative};
use crate::error::{Error, Result};
use crate::fsutil;

/// Controllers whose directory identifies the cgroup, in order of preference.
const IDENTITY_CONTROLLERS: [&str; 5] = ["memory", "cpu", "cpuacct", "pids", "blkio"];

/// Resolves controller directories of one cgroup.
#[derive(Debug, Clone, Copy)]
pub(super) struct ControllerDirs<'a> {
    mounts: &'a BTreeMap<String, PathBuf>,
    relative_path: &'a Path,
}

impl<'a> ControllerDirs<'a> {
    pub(super) fn new(mounts: &'a BTreeMap<String, PathBuf>, relative_path: &'a Path) -> Self {
        let relative_path = relative_path.strip_prefix("/").unwrap_or(relative_path);
        Self {
            mounts,
            relative_path,
        }
    }

    /// Returns the cgroup directory in the hierarchy of `controller`, if it is mounted.
    pub(super) fn get(&self, controller: &str) -> Option<PathBuf> {
        self.mounts
            .get(controller)
            .map(|mount| mount.join(self.relative_path))
    }

    /// Returns the first mounted controller, preferring [`IDENTITY_CONTROLLERS`].
    fn identity(&self) -> Option<(&'a str, PathBuf)> {
        IDENTITY_CONTROLLERS
            .iter()
            .find_map(|&c| self.mounts.get_key_value(c))
            .or_else(|| self.mounts.iter().next())
            .map(|(name, mount)| (name.as_str(), mount.join(self.relative_path)))
    }
}

/// A cgroup on v1 hierarchies.
#[derive(Debug)]
pub struct CgroupV1 {
    identifier: String,
    mounts: Arc<BTreeMap<String, PathBuf>>,
    relative_path: PathBuf,
    inode: u64,
    pids: PidLister,
}

impl CgroupV1 {
    /// Opens the cgroup at `relative_path` given the mount point of every v1 controller.
    ///
    /// The inode and the process list come from the directory of the first mounted
    /// controller among `memory`, `cpu`, `cpuacct`, `pids` and `blkio`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no controller is mounted and
    /// [`Error::FileSystem`] if the cgroup directory does not exist (anymore).
    pub fn new(
        identifier: impl Into<String>,
        mounts: Arc<BTreeMap<String, PathBuf>>,
        relative_path: impl AsRef<Path>,
        pid_source: PidSource,
    ) -> Result<Self> {
        let relative_path = relative(relative_path.as_ref());
        let dirs = ControllerDirs::new(&mounts, &relative_path);
        let (controller, dir) = dirs.identity().ok_or_else(|| Error::InvalidInput {
            desc: "no cgroup v1 controller is mounted".to_owned(),
        })?;
        let inode = fsutil::inode_of(&dir).map_err(|source| Error::FileSystem {
            path: dir.clone(),
            source,
        })?;
        let membership = Membership::controller(controller, &relative_path);
        let pids = PidLister::new(pid_source, dir, membership);

        Ok(Self {
            identifier: identifier.into(),
            mounts,
            relative_path,
            inode,
            pids,
        })
    }

    /// The cgroup path relative to the controller mount points, empty for the root cgroup.
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    fn dirs(&self) -> ControllerDirs<'_> {
        ControllerDirs::new(&self.mounts, &self.relative_path)
    }
}

impl Cgroup for CgroupV1 {
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
        let cgroup = CgroupV1::new(
            parent_identifier(parent),
            Arc::clone(&self.mounts),
            parent,
            source,
        )?;
        Ok(Box::new(cgroup))
    }

    fn cpu_stats(&self, stats: &mut CpuStats) -> Result<()> {
        stats.merge(cpu::read_cpu_stats(&self.dirs())?);
        Ok(())
    }

    fn memory_stats(&self, stats: &mut MemoryStats) -> Result<()> {
        stats.merge(memory::read_memory_stats(&self.dirs())?);
        Ok(())
    }

    fn io_stats(&self, stats: &mut IoStats) -> Result<()> {
        stats.merge(io::read_io_stats(&self.dirs())?);
        Ok(())
    }

    fn pid_stats(&self, stats: &mut PidStats) -> Result<()> {
        stats.merge(pid::read_pid_stats(&self.dirs())?);
        Ok(())
    }

    fn pids(&self, cache_validity: Duration) -> Result<Vec<i32>> {
        self.pids.list(&self.identifier, cache_validity)
    }
}
