//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Configuration errors indicate a setup bug, not a transient condition,
/// and are never retried.
#[derive(Error, Debug)]
pub enum PixelqError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A batch was requested before enough transitions were stored.
    #[error("Requested a batch of {requested} transitions, but only {available} are stored")]
    InsufficientTransitions {
        /// Requested batch size.
        requested: usize,
        /// Number of transitions currently stored.
        available: usize,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An observation did not have the expected shape.
    #[error("Frame shape mismatch: expected {expected} elements, got {got}")]
    FrameShapeMismatch {
        /// Expected number of elements.
        expected: usize,
        /// Actual number of elements.
        got: usize,
    },
}
