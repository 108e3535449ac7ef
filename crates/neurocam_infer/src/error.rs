//! Error types for neurocam_infer.

use neurocam_explain::ExplainError;
use neurocam_transforms::TransformError;
use thiserror::Error;

/// Result type alias using [`InferError`].
pub type Result<T> = std::result::Result<T, InferError>;

/// Caller-visible failure categories of a request.
#[derive(Error, Debug)]
pub enum InferError {
    /// The request does not carry a usable image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The encoded image exceeds the configured limit; nothing was decoded.
    #[error("Payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Payload size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A caller-supplied class index is outside the model's logits.
    #[error("Class index {class} out of range for {n_classes} logits")]
    InvalidClass {
        /// Requested class.
        class: usize,
        /// Number of logits.
        n_classes: usize,
    },

    /// The model, labels and target layer are wired inconsistently.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any other failure; the cause is logged, not returned.
    #[error("Processing failed: {0}")]
    Processing(&'static str),
}

impl From<TransformError> for InferError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Decode(e) => InferError::InvalidImage(e.to_string()),
            TransformError::InvalidDimensions { width, height } => {
                InferError::InvalidImage(format!("image is {width}x{height}"))
            }
            TransformError::UnsupportedChannels(_) => InferError::Configuration(err.to_string()),
            TransformError::Core(e) => {
                tracing::error!(error = %e, "preprocessing failed");
                InferError::Processing("preprocessing")
            }
        }
    }
}

impl From<ExplainError> for InferError {
    fn from(err: ExplainError) -> Self {
        match err {
            ExplainError::ClassOutOfRange { class, n_classes } => {
                InferError::InvalidClass { class, n_classes }
            }
            ExplainError::UnknownLayer { .. } | ExplainError::CaptureCount { .. } => {
                tracing::error!(error = %err, "saliency wiring");
                InferError::Configuration(err.to_string())
            }
            other => {
                tracing::error!(error = %other, "saliency failed");
                InferError::Processing("saliency")
            }
        }
    }
}
