//! Enumeration of the processes in a cgroup.
//!
//! From the host PID namespace `cgroup.procs` lists usable PIDs and is read on every
//! call. From an isolated namespace those PIDs belong to the host and would be
//! meaningless, so the host procfs is scanned instead and the result is cached.

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::fsutil;

/// Where the process ids of a cgroup come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PidSource {
    /// Read `cgroup.procs` of the cgroup directory.
    CgroupProcs,
    /// Scan `<procfs>/<pid>/cgroup` of every process on the host.
    ProcScan { procfs: PathBuf },
}

/// How a cgroup shows up in `/proc/<pid>/cgroup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Membership {
    /// `0::/path` on the unified hierarchy.
    Unified { path: String },
    /// `<id>:<controllers>:/path` on the hierarchy holding `controller`.
    Controller { controller: String, path: String },
}

impl Membership {
    pub(crate) fn unified(relative: &Path) -> Self {
        Membership::Unified {
            path: cgroup_path(relative),
        }
    }

    pub(crate) fn controller(controller: &str, relative: &Path) -> Self {
        Membership::Controller {
            controller: controller.to_owned(),
            path: cgroup_path(relative),
        }
    }

    /// Returns `true` if a line of `/proc/<pid>/cgroup` places the process in this cgroup.
    ///
    /// The path in that line is relative to the reader's cgroup namespace. From a private
    /// namespace, cgroups outside of it show up as `/../<rest>`, so such paths match on
    /// their trailing components.
    fn matches(&self, line: &str) -> bool {
        let mut fields = line.trim_end().splitn(3, ':');
        let (Some(id), Some(controllers), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            return false;
        };

        match self {
            Membership::Unified { path: own } => {
                id == "0" && controllers.is_empty() && same_cgroup(own, path)
            }
            Membership::Controller {
                controller,
                path: own,
            } => same_cgroup(own, path) && controllers.split(',').any(|c| c == controller),
        }
    }
}

fn same_cgroup(own: &str, reported: &str) -> bool {
    let mut components = reported.split('/').filter(|c| !c.is_empty()).peekable();
    let mut escaped = false;
    while components.next_if_eq(&"..").is_some() {
        escaped = true;
    }
    if !escaped {
        return own == reported;
    }

    let rest: Vec<&str> = components.collect();
    let own: Vec<&str> = own.split('/').filter(|c| !c.is_empty()).collect();
    !rest.is_empty() && own.ends_with(&rest)
}

fn cgroup_path(relative: &Path) -> String {
    format!("/{}", relative.to_string_lossy().trim_matches('/'))
}

struct CachedPids {
    fetched_at: Instant,
    pids: Vec<i32>,
}

/// Lists the PIDs of one cgroup according to a [`PidSource`].
#[derive(Debug)]
pub(crate) struct PidLister {
    source: PidSource,
    dir: PathBuf,
    membership: Membership,
    cache: Mutex<Option<CachedPids>>,
}

impl std::fmt::Debug for CachedPids {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedPids")
            .field("age", &self.fetched_at.elapsed())
            .field("pids", &self.pids.len())
            .finish()
    }
}

impl PidLister {
    /// `dir` is the cgroup directory holding `cgroup.procs`.
    pub(crate) fn new(source: PidSource, dir: PathBuf, membership: Membership) -> Self {
        Self {
            source,
            dir,
            membership,
            cache: Mutex::new(None),
        }
    }

    pub(crate) fn source(&self) -> &PidSource {
        &self.source
    }

    /// Returns the PIDs of the cgroup.
    ///
    /// With [`PidSource::ProcScan`] a result younger than `cache_validity` is reused; a
    /// zero validity always rescans.
    pub(crate) fn list(&self, identifier: &str, cache_validity: Duration) -> Result<Vec<i32>> {
        let procfs = match &self.source {
            PidSource::CgroupProcs => {
                return read_cgroup_procs(&self.dir.join("cgroup.procs")).map_err(|source| {
                    Error::PidEnumeration {
                        identifier: identifier.to_owned(),
                        source,
                    }
                });
            }
            PidSource::ProcScan { procfs } => procfs,
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < cache_validity)
        {
            return Ok(cached.pids.clone());
        }

        let pids = self
            .scan(procfs)
            .map_err(|source| Error::PidEnumeration {
                identifier: identifier.to_owned(),
                source,
            })?;
        log::trace!("Scanned {} pids for cgroup {}", pids.len(), identifier);
        *cache = Some(CachedPids {
            fetched_at: Instant::now(),
            pids: pids.clone(),
        });
        Ok(pids)
    }

    fn scan(&self, procfs: &Path) -> io::Result<Vec<i32>> {
        // A removed cgroup has no members; report it instead of an empty list.
        fs::metadata(&self.dir)?;

        let mut pids = Vec::new();
        for entry in fs::read_dir(procfs)? {
            let entry = entry?;
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<i32>().ok())
            else {
                continue;
            };

            // The process may exit between listing and reading.
            let Ok(member) = fsutil::read_with(entry.path().join("cgroup"), |buf| {
                self.is_member(buf)
            }) else {
                continue;
            };
            if member {
                pids.push(pid);
            }
        }

        pids.sort_unstable();
        Ok(pids)
    }

    fn is_member<R: BufRead>(&self, buf: &mut R) -> io::Result<bool> {
        for line in buf.lines() {
            if self.membership.matches(&line?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Reads the PIDs listed in a `cgroup.procs` file.
///
/// PID 0 stands for processes outside the reader's namespace and is skipped.
fn read_cgroup_procs(path: &Path) -> io::Result<Vec<i32>> {
    fsutil::read_with(path, |buf| {
        let mut pids = Vec::new();
        for line in buf.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let pid = line
                .parse::<i32>()
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            if pid != 0 {
                pids.push(pid);
            }
        }
        Ok(pids)
    })
}
