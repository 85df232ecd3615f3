use std::path::{Path, PathBuf};

/// Environment variable naming the mount point of the host root filesystem.
pub const ROOTFS_ENV: &str = "ROOTFS_MOUNT_PATH";

/// Where to find the host's procfs and cgroup mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the host filesystem. `/` when running on the host, usually `/rootfs` in a
    /// container started with the host root bind-mounted.
    pub rootfs: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rootfs: PathBuf::from("/"),
        }
    }
}

impl Config {
    /// Creates a config for the given host root.
    pub fn new(rootfs: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
        }
    }

    /// Builds the config from the environment.
    ///
    /// Reads the host root from [`ROOTFS_ENV`]; falls back to `/` when unset.
    pub fn from_env() -> Self {
        Self::from_var(std::env::var_os(ROOTFS_ENV))
    }

    fn from_var(rootfs: Option<std::ffi::OsString>) -> Self {
        match rootfs.filter(|value| !value.is_empty()) {
            Some(rootfs) => Self::new(rootfs),
            None => Self::default(),
        }
    }

    /// The host procfs, `<rootfs>/proc`.
    pub fn procfs(&self) -> PathBuf {
        self.rootfs.join("proc")
    }

    /// The mountinfo of the host init process, `<rootfs>/proc/1/mountinfo`.
    pub fn mountinfo(&self) -> PathBuf {
        self.procfs().join("1/mountinfo")
    }

    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_host_root() {
        let config = Config::default();
        assert_eq!(config.procfs(), PathBuf::from("/proc"));
        assert_eq!(config.mountinfo(), PathBuf::from("/proc/1/mountinfo"));
    }

    #[test]
    fn test_from_var() {
        let config = Config::from_var(Some("/rootfs".into()));
        assert_eq!(config.rootfs(), Path::new("/rootfs"));
        assert_eq!(config.procfs(), PathBuf::from("/rootfs/proc"));

        assert_eq!(Config::from_var(Some("".into())), Config::default());
        assert_eq!(Config::from_var(None), Config::default());
    }
}
