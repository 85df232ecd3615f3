use std::fs::File;
use std::io::{self, BufReader};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use cgroup_stats::fsutil;
/// let reader = fsutil::open_file_reader("/sys/fs/cgroup/cpu.stat")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Opens `path` and hands the buffered reader to `reader`.
///
/// Open failures and reader failures are reported the same way, as a plain
/// [`io::Error`], so callers can decide how to classify them.
pub fn read_with<T>(
    path: impl AsRef<Path>,
    reader: impl FnOnce(&mut BufReader<File>) -> io::Result<T>,
) -> io::Result<T> {
    let mut buf = BufReader::new(File::open(path)?);
    reader(&mut buf)
}

/// Returns the inode number of the file or directory at `path`.
///
/// # Errors
///
/// Returns the underlying [`io::Error`] if `path` cannot be stat'ed.
pub fn inode_of(path: impl AsRef<Path>) -> io::Result<u64> {
    Ok(std::fs::metadata(path)?.ino())
}

/// Joins a host-absolute path below `rootfs`, e.g. `/sys/fs/cgroup` below `/rootfs`.
pub fn host_path(rootfs: &Path, path: &Path) -> PathBuf {
    rootfs.join(path.strip_prefix("/").unwrap_or(path))
}
