use std::path::PathBuf;

/// Errors that may occur during environment detection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read symlink `{path}`: {source}")]
    ReadSymlink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
