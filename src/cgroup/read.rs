//! File access shared by the v1 and v2 readers.
//!
//! Each stat domain has one file it cannot be collected without, read through
//! [`read_required`] or [`read_controller_file`], and any number of secondary files read
//! through [`read_optional`], whose failures never fail the domain.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::error::{Error, Result, ResultOkLogExt};
use crate::fsutil;

/// Reads a file the current domain cannot be collected without.
pub(super) fn read_required<T>(
    path: &Path,
    reader: impl FnOnce(&mut BufReader<File>) -> io::Result<T>,
) -> Result<T> {
    fsutil::read_with(path, reader).map_err(|err| Error::from_read(path, err))
}

/// Reads a controller's interface file; a missing file means the controller is not
/// enabled for this cgroup.
pub(super) fn read_controller_file<T>(
    path: &Path,
    controller: &'static str,
    reader: impl FnOnce(&mut BufReader<File>) -> io::Result<T>,
) -> Result<T> {
    match fsutil::read_with(path, reader) {
        Ok(value) => Ok(value),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(Error::ControllerNotFound { controller })
        }
        Err(err) => Err(Error::from_read(path, err)),
    }
}

/// Reads a secondary file.
///
/// Missing files are expected (older kernels, disabled features, root cgroup) and yield
/// `None` silently; other failures are logged at debug level.
pub(super) fn read_optional<T>(
    path: &Path,
    reader: impl FnOnce(&mut BufReader<File>) -> io::Result<T>,
) -> Option<T> {
    match fsutil::read_with(path, reader) {
        Ok(value) => Some(value),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => Err::<T, _>(Error::from_read(path, err)).ok_log(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::parse::{Counter, SingleLineStat};

    #[test]
    fn test_read_required() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("memory.current"), "4096\n").unwrap();
        std::fs::write(dir.path().join("memory.peak"), "lots\n").unwrap();

        let value = read_required(&dir.path().join("memory.current"), Counter::from_reader);
        assert_eq!(value.unwrap(), Counter(4096));

        let err = read_required(&dir.path().join("memory.peak"), Counter::from_reader).unwrap_err();
        assert!(matches!(err, Error::Value { .. }));

        let err = read_required(&dir.path().join("memory.swap.current"), Counter::from_reader)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_controller_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_controller_file(&dir.path().join("pids.current"), "pids", Counter::from_reader)
            .unwrap_err();
        assert!(matches!(err, Error::ControllerNotFound { controller: "pids" }));
    }

    #[test]
    fn test_read_optional() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("memory.peak"), "lots\n").unwrap();

        assert_eq!(
            read_optional(&dir.path().join("memory.peak"), Counter::from_reader),
            None
        );
        assert_eq!(
            read_optional(&dir.path().join("missing"), Counter::from_reader),
            None
        );
    }
}
