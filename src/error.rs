use std::path::PathBuf;

use crate::cgroup::parse::StatParseError;

/// Errors returned by [`crate::cgroup::Cgroup`] implementations and the stats aggregator.
///
/// Collection errors are scoped to one resource domain; the aggregator reports them per
/// domain and never lets one of them abort the others.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {desc}")]
    InvalidInput { desc: String },

    #[error("cgroup controller `{controller}` not found")]
    ControllerNotFound { controller: &'static str },

    #[error("failed to read `{path}`: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`: {source}")]
    Value {
        path: PathBuf,
        #[source]
        source: StatParseError,
    },

    #[error("cgroup `{identifier}` has no parent")]
    ParentNotFound { identifier: String },

    #[error("unable to enumerate pids of cgroup `{identifier}`: {source}")]
    PidEnumeration {
        identifier: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    MountInfo(#[from] crate::mountinfo::Error),
}

impl Error {
    /// Builds an error for a failed read of `path`, keeping parse failures apart from I/O.
    ///
    /// Parsers report [`StatParseError`] wrapped into an [`std::io::Error`]; this unwraps it
    /// back into [`Error::Value`].
    pub(crate) fn from_read(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let kind = err.kind();
        if !err
            .get_ref()
            .is_some_and(|inner| inner.is::<StatParseError>())
        {
            return Error::FileSystem { path, source: err };
        }

        match err.into_inner().map(|inner| inner.downcast::<StatParseError>()) {
            Some(Ok(source)) => Error::Value {
                path,
                source: *source,
            },
            Some(Err(other)) => Error::FileSystem {
                path,
                source: std::io::Error::new(kind, other),
            },
            None => Error::FileSystem {
                path,
                source: kind.into(),
            },
        }
    }

    /// Returns `true` if the error stems from a file or directory that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::FileSystem { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::debug!("{err}");
                None
            }
        }
    }
}
