//! Block I/O accounting of the v1 `blkio` controller.
//!
//! The throttle files count every I/O of the cgroup, unlike the CFQ-only
//! `blkio.io_service_bytes`. They list one operation per line:
//!
//! ```text
//! 8:0 Read 1024
//! 8:0 Write 2048
//! 8:0 Sync 3072
//! 8:0 Async 0
//! 8:0 Discard 0
//! 8:0 Total 3072
//! Total 3072
//! ```
//!
//! The limit files (`blkio.throttle.read_bps_device`, ...) hold `major:minor value` lines.

use std::collections::BTreeMap;
use std::io::BufRead;

use super::ControllerDirs;
use crate::cgroup::parse::StatParseError;
use crate::cgroup::read;
use crate::cgroup::stats::{DeviceIoStats, IoStats};
use crate::error::{Error, Result};

type DeviceSetter = fn(&mut DeviceIoStats, u64);

/// Parses a `Read`/`Write` breakdown file, applying the values through `read` and `write`.
///
/// Other operations and the trailing `Total` line are ignored.
fn parse_rw_file<R: BufRead>(
    buf: &mut R,
    read: DeviceSetter,
    write: DeviceSetter,
) -> std::io::Result<BTreeMap<String, DeviceIoStats>> {
    let mut devices: BTreeMap<String, DeviceIoStats> = BTreeMap::new();

    let mut line = String::new();
    let mut lineno = 0;
    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        let mut parts = line.split_whitespace();
        if let (Some(device), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) {
            let setter = match op {
                "Read" => Some(read),
                "Write" => Some(write),
                _ => None,
            };
            if let Some(setter) = setter {
                let value = value.parse::<u64>().map_err(|source| StatParseError::InvalidKeyValue {
                    key: op.to_string(),
                    value: value.to_string(),
                    line: lineno,
                    source,
                })?;
                setter(devices.entry(device.to_owned()).or_default(), value);
            }
        }
        line.clear();
    }

    Ok(devices)
}

/// Parses a `major:minor value` limit file.
fn parse_device_values<R: BufRead>(buf: &mut R) -> std::io::Result<BTreeMap<String, u64>> {
    let mut values = BTreeMap::new();

    let mut line = String::new();
    let mut lineno = 0;
    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(device), Some(value)) => {
                let value = value.parse::<u64>().map_err(|source| StatParseError::InvalidKeyValue {
                    key: device.to_string(),
                    value: value.to_string(),
                    line: lineno,
                    source,
                })?;
                values.insert(device.to_owned(), value);
            }
            (None, _) => {}
            (Some(_), None) => {
                return Err(StatParseError::InvalidLine {
                    content: line.trim_end().to_string(),
                    line: lineno,
                }
                .into());
            }
        }
        line.clear();
    }

    Ok(values)
}

const LIMIT_FILES: [(&str, DeviceSetter); 4] = [
    ("blkio.throttle.read_bps_device", |d, v| d.read_bytes_limit = Some(v)),
    ("blkio.throttle.write_bps_device", |d, v| d.write_bytes_limit = Some(v)),
    ("blkio.throttle.read_iops_device", |d, v| d.read_operations_limit = Some(v)),
    ("blkio.throttle.write_iops_device", |d, v| d.write_operations_limit = Some(v)),
];

/// Reads the I/O stats of a v1 cgroup; `blkio.throttle.io_service_bytes` is required.
pub(super) fn read_io_stats(dirs: &ControllerDirs<'_>) -> Result<IoStats> {
    let dir = dirs.get("blkio").ok_or(Error::ControllerNotFound {
        controller: "blkio",
    })?;

    let devices = read::read_required(&dir.join("blkio.throttle.io_service_bytes"), |buf| {
        parse_rw_file(
            buf,
            |d, v| d.read_bytes = Some(v),
            |d, v| d.write_bytes = Some(v),
        )
    })?;
    let mut stats = IoStats {
        devices,
        ..Default::default()
    };

    if let Some(operations) = read::read_optional(&dir.join("blkio.throttle.io_serviced"), |buf| {
        parse_rw_file(
            buf,
            |d, v| d.read_operations = Some(v),
            |d, v| d.write_operations = Some(v),
        )
    }) {
        for (device, ops) in operations {
            stats.devices.entry(device).or_default().merge(ops);
        }
    }
    stats.compute_totals();

    for (name, setter) in LIMIT_FILES {
        let Some(limits) = read::read_optional(&dir.join(name), parse_device_values) else {
            continue;
        };
        for (device, limit) in limits {
            setter(stats.devices.entry(device).or_default(), limit);
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::cgroup::parse::extract_stat_parse_error;
    use crate::cgroup::testutil::write_files;

    const SERVICE_BYTES: &str = "\
8:0 Read 1024
8:0 Write 2048
8:0 Sync 3072
8:0 Async 0
8:0 Discard 0
8:0 Total 3072
8:16 Read 1
8:16 Write 0
8:16 Total 1
Total 3073
";

    #[test]
    fn test_parse_rw_file() {
        let devices = parse_rw_file(
            &mut SERVICE_BYTES.as_bytes(),
            |d, v| d.read_bytes = Some(v),
            |d, v| d.write_bytes = Some(v),
        )
        .unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices["8:0"].read_bytes, Some(1024));
        assert_eq!(devices["8:0"].write_bytes, Some(2048));
        assert_eq!(devices["8:16"].write_bytes, Some(0));
        assert_eq!(devices["8:16"].read_operations, None);
    }

    #[test]
    fn test_parse_rw_file_invalid_value() {
        let err = parse_rw_file(
            &mut "8:0 Read many\n".as_bytes(),
            |d, v| d.read_bytes = Some(v),
            |d, v| d.write_bytes = Some(v),
        )
        .unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::InvalidKeyValue { line: 1, .. }
        ));
    }

    #[test]
    fn test_parse_device_values() {
        let values = parse_device_values(&mut "8:0 1048576\n8:16 100\n".as_bytes()).unwrap();
        assert_eq!(values["8:0"], 1_048_576);
        assert_eq!(values["8:16"], 100);

        let err = parse_device_values(&mut "8:0\n".as_bytes()).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::InvalidLine { .. }
        ));
    }

    #[test]
    fn test_read_io_stats() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("blkio/docker/abc");
        std::fs::create_dir_all(&dir).unwrap();
        write_files(
            &dir,
            &[
                ("blkio.throttle.io_service_bytes", SERVICE_BYTES),
                (
                    "blkio.throttle.io_serviced",
                    "8:0 Read 10\n8:0 Write 20\n8:0 Total 30\nTotal 30\n",
                ),
                ("blkio.throttle.read_bps_device", "8:0 1048576\n"),
                ("blkio.throttle.write_iops_device", ""),
            ],
        );
        let mounts = BTreeMap::from([("blkio".to_owned(), root.path().join("blkio"))]);

        let dirs = ControllerDirs::new(&mounts, Path::new("/docker/abc"));
        let stats = read_io_stats(&dirs).unwrap();
        assert_eq!(stats.read_bytes, Some(1025));
        assert_eq!(stats.write_bytes, Some(2048));
        assert_eq!(stats.read_operations, Some(10));
        assert_eq!(stats.write_operations, Some(20));
        assert_eq!(stats.devices["8:0"].read_bytes_limit, Some(1_048_576));
        assert_eq!(stats.devices["8:0"].write_operations_limit, None);
        assert!(stats.psi_some.is_none());
    }

    #[test]
    fn test_blkio_not_mounted() {
        let mounts = BTreeMap::new();
        let dirs = ControllerDirs::new(&mounts, Path::new(""));
        assert!(matches!(
            read_io_stats(&dirs),
            Err(Error::ControllerNotFound { controller: "blkio" })
        ));
    }
}
