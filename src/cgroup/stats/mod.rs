//! Resource usage records filled by [`super::Cgroup`] implementations.
//!
//! Every numeric field is an `Option`: a value the running cgroup version does not expose
//! stays `None` instead of reading as zero, and a domain that could not be collected at
//! all stays `None` in the [`Stats`] snapshot.
//!
//! # Main types
//!
//! - [`Stats`]: one snapshot with up to four populated domains.
//! - [`CpuStats`], [`MemoryStats`], [`IoStats`] (with [`DeviceIoStats`]), [`PidStats`]:
//!   per-domain records; each offers a `merge` that only overwrites fields set in the
//!   update.
//! - [`PsiStats`]: pressure stall information attached to CPU, memory and I/O on v2.

/// Assigns every listed `Option` field of `$other` to `$self` if it is `Some`.
macro_rules! merge_fields {
    ($self:ident, $other:ident; $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $self.$field = $other.$field;
            }
        )+
    };
}

mod cpu;
mod io;
mod memory;
mod pid;
mod psi;

pub use cpu::CpuStats;
pub use io::{DeviceIoStats, IoStats};
pub use memory::MemoryStats;
pub use pid::PidStats;
pub use psi::PsiStats;

use serde::Serialize;

/// A best-effort snapshot of one cgroup.
///
/// A domain is `Some` only if it was collected successfully; consumers must tolerate any
/// subset being absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Stats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io: Option<IoStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<PidStats>,
}
