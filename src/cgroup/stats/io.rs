use std::collections::BTreeMap;

use serde::Serialize;

use super::PsiStats;

/// Block I/O accounting of a cgroup.
///
/// The totals are sums over [`IoStats::devices`]; devices are keyed by `major:minor`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IoStats {
    pub read_bytes: Option<u64>,
    pub write_bytes: Option<u64>,
    pub read_operations: Option<u64>,
    pub write_operations: Option<u64>,
    pub devices: BTreeMap<String, DeviceIoStats>,
    pub psi_some: Option<PsiStats>,
    pub psi_full: Option<PsiStats>,
}

/// Block I/O accounting and throttling limits of one device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeviceIoStats {
    pub read_bytes: Option<u64>,
    pub write_bytes: Option<u64>,
    pub read_operations: Option<u64>,
    pub write_operations: Option<u64>,
    /// Read bandwidth limit in bytes per second.
    pub read_bytes_limit: Option<u64>,
    /// Write bandwidth limit in bytes per second.
    pub write_bytes_limit: Option<u64>,
    /// Read operations per second limit.
    pub read_operations_limit: Option<u64>,
    /// Write operations per second limit.
    pub write_operations_limit: Option<u64>,
}

impl DeviceIoStats {
    /// Overwrites the fields that are set in `other`.
    pub fn merge(&mut self, other: DeviceIoStats) {
        merge_fields!(
            self, other;
            read_bytes,
            write_bytes,
            read_operations,
            write_operations,
            read_bytes_limit,
            write_bytes_limit,
            read_operations_limit,
            write_operations_limit,
        );
    }
}

impl IoStats {
    /// Recomputes the totals from the per-device counters.
    ///
    /// A total stays `None` if no device reports the counter.
    pub fn compute_totals(&mut self) {
        fn sum(devices: &BTreeMap<String, DeviceIoStats>, f: fn(&DeviceIoStats) -> Option<u64>) -> Option<u64> {
            devices
                .values()
                .filter_map(f)
                .fold(None, |acc, v| Some(acc.unwrap_or(0).saturating_add(v)))
        }

        self.read_bytes = sum(&self.devices, |d| d.read_bytes);
        self.write_bytes = sum(&self.devices, |d| d.write_bytes);
        self.read_operations = sum(&self.devices, |d| d.read_operations);
        self.write_operations = sum(&self.devices, |d| d.write_operations);
    }

    /// Overwrites the fields that are set in `other`.
    ///
    /// A non-empty device map in `other` replaces the current one, so devices that are no
    /// longer reported drop out together with their share of the totals.
    pub fn merge(&mut self, other: IoStats) {
        merge_fields!(
            self, other;
            read_bytes,
            write_bytes,
            read_operations,
            write_operations,
            psi_some,
            psi_full,
        );
        if !other.devices.is_empty() {
            self.devices = other.devices;
        }
    }
}
