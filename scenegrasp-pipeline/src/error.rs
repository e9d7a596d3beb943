//! Pipeline error types.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error (configuration, source or sink).
    #[error("core error: {0}")]
    Core(#[from] scenegrasp_core::Error),

    /// File I/O error from a source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] scenegrasp_io::Error),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}
