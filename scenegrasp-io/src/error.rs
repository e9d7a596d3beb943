//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Frame layout could not be decoded.
    #[error("ingest error: {0}")]
    Ingest(#[from] scenegrasp_core::IngestError),

    /// Summary serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] scenegrasp_core::Error),
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::InvalidFormat(message.into())
    }
}
