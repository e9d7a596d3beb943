//! Error types for scenegrasp-core.

use thiserror::Error;

/// Result type alias for scenegrasp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for scenegrasp operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Raw frame could not be turned into a point set.
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Frame source failure.
    #[error("frame source error: {0}")]
    Source(String),

    /// Scene sink failure.
    #[error("scene sink error: {0}")]
    Sink(String),
}

/// Errors raised while decoding a raw frame layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// A required coordinate field is absent.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// The field uses a datatype that cannot carry that channel.
    #[error("field '{name}' has unsupported datatype {datatype}")]
    UnsupportedFieldType { name: String, datatype: u8 },

    /// The field extends past the end of a point record.
    #[error("field '{name}' at offset {offset} overflows point step {point_step}")]
    FieldOutOfBounds {
        name: String,
        offset: u32,
        point_step: u32,
    },

    /// The data buffer does not match the declared dimensions.
    #[error("data length mismatch: expected {expected} bytes, found {actual}")]
    DataLength { expected: usize, actual: usize },

    /// Width, height or step values are inconsistent.
    #[error("invalid frame dimensions: {0}")]
    InvalidDimensions(String),
}

/// Failure reported by a grasp planner for a single object.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraspError {
    /// The planner chose not to produce a grasp for this target.
    #[error("grasp declined: {0}")]
    Declined(String),

    /// The object geometry cannot support a grasp.
    #[error("degenerate object with {points} points")]
    DegenerateObject { points: usize },

    /// The planner failed internally.
    #[error("grasp computation failed: {0}")]
    Failed(String),
}
