//! Error types for neurocam_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur in neurocam_core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid tensor shape provided.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// Dimension error.
    #[error("Dimension error: expected {expected} dimensions, got {got}")]
    DimensionError {
        /// Expected number of dimensions.
        expected: usize,
        /// Actual number of dimensions.
        got: usize,
    },

    /// An operation required a different network mode.
    #[error("Mode violation: operation requires {required} mode, context is in {actual} mode")]
    ModeViolation {
        /// Mode the operation requires.
        required: crate::Mode,
        /// Mode the context is in.
        actual: crate::Mode,
    },

    /// Tensor data could not be read back from the backend.
    #[error("Tensor data error: {0}")]
    TensorData(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
