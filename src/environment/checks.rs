use super::{Error, Result};
use std::fs;
use std::path::Path;

/// The PID namespace the observer runs in, relative to the host init process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidNamespace {
    /// Same PID namespace as the host; `cgroup.procs` reports usable PIDs.
    Host,
    /// A different PID namespace, e.g. running inside a container with the host `/proc`
    /// mounted somewhere below the root filesystem.
    Isolated,
}

/// Returns true if the init process PID namespace is different from the current process.
///
/// # Arguments
///
/// * `self_ns` - The observer's PID namespace link, normally `/proc/self/ns/pid`.
/// * `procfs` - The host procfs, used to resolve `<procfs>/1/ns/pid`.
///
/// # Errors
///
/// Returns [`Error::ReadSymlink`] if reading the symbolic link for either PID namespace fails.
pub fn is_pid_namespace_isolated(self_ns: impl AsRef<Path>, procfs: impl AsRef<Path>) -> Result<bool> {
    let self_ns_path = self_ns.as_ref();
    let self_ns = fs::read_link(self_ns_path).map_err(|source| Error::ReadSymlink {
        path: self_ns_path.to_path_buf(),
        source,
    })?;

    let root_ns_path = procfs.as_ref().join("1/ns/pid");
    let root_ns = fs::read_link(&root_ns_path).map_err(|source| Error::ReadSymlink {
        path: root_ns_path.to_path_buf(),
        source,
    })?;

    Ok(self_ns != root_ns)
}

/// Detects the PID namespace of the current process relative to the host procfs.
///
/// Failures are logged as warnings and resolve to [`PidNamespace::Host`], so PIDs are
/// read live from `cgroup.procs` rather than from a possibly unreadable host procfs.
pub fn pid_namespace(procfs: impl AsRef<Path>) -> PidNamespace {
    match is_pid_namespace_isolated("/proc/self/ns/pid", procfs) {
        Ok(true) => PidNamespace::Isolated,
        Ok(false) => PidNamespace::Host,
        Err(err) => {
            log::warn!("PID namespace check failed, assuming host namespace: {}", err);
            PidNamespace::Host
        }
    }
}
