use crate::fsutil;

use super::parser::parse_mount_info_line;
use super::{Error, Result};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// The cgroup layout a host exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    /// Per-controller hierarchies (`cgroup` mounts).
    V1,
    /// The unified hierarchy (`cgroup2` mount).
    V2,
}

/// Cgroup mount points found in a mountinfo file.
///
/// Mount points are reported as written in the mountinfo file, i.e. relative to the root
/// of the process whose mountinfo was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgroupMounts {
    /// Mount point of the unified (`cgroup2`) hierarchy, if any.
    pub unified: Option<PathBuf>,
    /// Mount point of each cgroup v1 controller, keyed by controller name.
    pub controllers: BTreeMap<String, PathBuf>,
}

impl CgroupMounts {
    /// Returns the version to read stats from.
    ///
    /// Hybrid hosts (v1 controllers plus a controller-less unified mount used by systemd)
    /// account resources in the v1 hierarchies, so any v1 controller wins.
    pub fn version(&self) -> Option<CgroupVersion> {
        if !self.controllers.is_empty() {
            Some(CgroupVersion::V1)
        } else if self.unified.is_some() {
            Some(CgroupVersion::V2)
        } else {
            None
        }
    }

    /// Returns a copy with every mount point re-rooted below `rootfs`.
    pub fn rooted_at(&self, rootfs: &Path) -> Self {
        Self {
            unified: self
                .unified
                .as_deref()
                .map(|path| fsutil::host_path(rootfs, path)),
            controllers: self
                .controllers
                .iter()
                .map(|(name, path)| (name.clone(), fsutil::host_path(rootfs, path)))
                .collect(),
        }
    }
}

/// Detects the cgroup mounts by parsing a Linux `mountinfo` file.
///
/// The first `cgroup2` entry becomes the unified mount point. Every `cgroup` entry
/// registers its controllers; if a controller shows up twice, the first mount wins.
///
/// # Arguments
///
/// * `path` - Path to a Linux mountinfo file (e.g., `/proc/1/mountinfo`).
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
/// - [`Error::MissingCgroupMount`] if neither a `cgroup` nor a `cgroup2` mount is found.
///
/// # Example
///
/// ```no_run
/// use cgroup_stats::mountinfo::detect_cgroup_mounts;
///
/// let mounts = detect_cgroup_mounts("/proc/1/mountinfo").unwrap();
/// println!("cgroup version: {:?}", mounts.version());
/// ```
pub fn detect_cgroup_mounts(path: impl AsRef<Path>) -> Result<CgroupMounts> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_cgroup_mounts_from_reader(buf, path)
}

/// Internal implementation for detecting the cgroup mounts from a reader.
///
/// `origin` is only used in error messages.
fn detect_cgroup_mounts_from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<CgroupMounts> {
    let mut line = String::with_capacity(256);
    let mut mounts = CgroupMounts::default();

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        let mount_info = parse_mount_info_line(line.trim_end()).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        match mount_info.fs_type {
            "cgroup2" if mounts.unified.is_none() => {
                log::debug!(
                    "Found `cgroup2` mount point with root `{}`: {}",
                    mount_info.root,
                    mount_info.mount_point
                );
                mounts.unified = Some(PathBuf::from(mount_info.mount_point));
            }
            "cgroup" => {
                for controller in mount_info.cgroup_controllers() {
                    log::trace!(
                        "Found `cgroup` controller `{}` at {}",
                        controller,
                        mount_info.mount_point
                    );
                    mounts
                        .controllers
                        .entry(controller.to_owned())
                        .or_insert_with(|| PathBuf::from(mount_info.mount_point));
                }
            }
            _ => {}
        }

        line.clear();
    }

    if mounts.version().is_none() {
        return Err(Error::MissingCgroupMount {
            path: origin.to_path_buf(),
        });
    }

    Ok(mounts)
}
