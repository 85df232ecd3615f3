//! Environment detection module.
//!
//! Determines whether the program observes cgroups from the host PID namespace or from an
//! isolated one, which decides how process ids of a cgroup can be enumerated.
mod checks;
mod error;

pub use checks::{PidNamespace, is_pid_namespace_isolated, pid_namespace};
pub use error::{Error, Result};
