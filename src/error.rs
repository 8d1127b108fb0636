use std::io;
use std::path::PathBuf;

/// Result alias for configuration-time operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type returned when building or installing a logger.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Error type returned by [`Handler::handle`](crate::handler::Handler::handle).
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
