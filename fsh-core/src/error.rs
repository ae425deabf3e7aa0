use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for hashing and verification.
///
/// `Io` and `NotFound` are fatal to the single file they name but never to a
/// batch; `Format` aborts an entire verify run; `LineParse` is recoverable
/// (the line is skipped and reported).
#[derive(Error, Debug)]
pub enum Error {
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Format(String),

    #[error("manifest line {line}: {reason}")]
    LineParse { line: usize, reason: String },

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}
