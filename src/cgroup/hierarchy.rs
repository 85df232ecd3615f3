use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::pids::PidSource;
use super::{Cgroup, CgroupV1, CgroupV2};
use crate::config::Config;
use crate::environment::{self, PidNamespace};
use crate::error::{Error, Result};
use crate::mountinfo::{self, CgroupMounts, CgroupVersion};

/// The cgroup layout of a host, used to open [`Cgroup`]s by relative path.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    version: CgroupVersion,
    unified: Option<PathBuf>,
    controllers: Arc<BTreeMap<String, PathBuf>>,
    pid_source: PidSource,
}

impl Hierarchy {
    /// Detects the hierarchy from the host's `/proc/1/mountinfo` below [`Config::rootfs`].
    ///
    /// Mount points are re-rooted below the host root, and processes are listed through a
    /// procfs scan when the current PID namespace differs from the host's.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MountInfo`] if the mountinfo file cannot be read or lists no cgroup
    /// mount.
    pub fn detect(config: &Config) -> Result<Self> {
        let mounts = mountinfo::detect_cgroup_mounts(config.mountinfo())?.rooted_at(config.rootfs());
        let pid_source = match environment::pid_namespace(config.procfs()) {
            PidNamespace::Host => PidSource::CgroupProcs,
            PidNamespace::Isolated => PidSource::ProcScan {
                procfs: config.procfs(),
            },
        };
        log::info!(
            "Using cgroup mounts: unified={:?}, controllers={:?}",
            mounts.unified,
            mounts.controllers.keys().collect::<Vec<_>>()
        );
        Self::new(mounts, pid_source)
    }

    /// Builds a hierarchy from already detected mounts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `mounts` holds no cgroup mount at all.
    pub fn new(mounts: CgroupMounts, pid_source: PidSource) -> Result<Self> {
        let version = mounts.version().ok_or_else(|| Error::InvalidInput {
            desc: "no cgroup mount".to_owned(),
        })?;
        Ok(Self {
            version,
            unified: mounts.unified,
            controllers: Arc::new(mounts.controllers),
            pid_source,
        })
    }

    pub fn version(&self) -> CgroupVersion {
        self.version
    }

    pub fn pid_source(&self) -> &PidSource {
        &self.pid_source
    }

    /// Opens the cgroup at `relative_path`, e.g. `system.slice/docker-<id>.scope` on v2 or
    /// `docker/<id>` on v1. An empty path is the root cgroup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileSystem`] if the cgroup does not exist.
    pub fn cgroup(
        &self,
        identifier: &str,
        relative_path: impl AsRef<Path>,
    ) -> Result<Box<dyn Cgroup>> {
        let pid_source = self.pid_source.clone();
        match (self.version, &self.unified) {
            (CgroupVersion::V2, Some(mount)) => Ok(Box::new(CgroupV2::new(
                identifier,
                mount.clone(),
                relative_path,
                pid_source,
            )?)),
            _ => Ok(Box::new(CgroupV1::new(
                identifier,
                Arc::clone(&self.controllers),
                relative_path,
                pid_source,
            )?)),
        }
    }
}
