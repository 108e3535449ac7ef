//! Error types for neurocam_explain.

use neurocam_core::CoreError;
use thiserror::Error;

/// Result type alias using [`ExplainError`].
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Errors raised while capturing layers or computing saliency.
#[derive(Error, Debug)]
pub enum ExplainError {
    /// The target layer is not one of the model's observable layers.
    #[error("Unknown target layer '{layer}' (available: {available})")]
    UnknownLayer {
        /// Requested layer.
        layer: String,
        /// Comma-separated observable layers.
        available: String,
    },

    /// A capture buffer did not hold exactly one entry after a pass.
    ///
    /// Zero entries means the target layer was not reached (or does not
    /// contribute to the selected logit for gradients).
    #[error("Expected exactly one {kind} for layer '{layer}', captured {got}")]
    CaptureCount {
        /// `"activation"` or `"gradient"`.
        kind: &'static str,
        /// Target layer.
        layer: String,
        /// Number of captured entries.
        got: usize,
    },

    /// Requested class index is outside the model's logits.
    #[error("Class index {class} out of range for {n_classes} logits")]
    ClassOutOfRange {
        /// Requested class.
        class: usize,
        /// Number of logits.
        n_classes: usize,
    },

    /// Saliency is computed for a single image only.
    #[error("Unsupported batch size {0}: saliency requires batch size 1")]
    UnsupportedBatch(usize),

    /// Activation and gradient shapes differ.
    #[error("Shape mismatch: activations {activations:?}, gradients {gradients:?}")]
    ShapeMismatch {
        /// Activation dims.
        activations: [usize; 3],
        /// Gradient dims.
        gradients: [usize; 3],
    },

    /// Core error (mode violation, tensor read-back).
    #[error(transparent)]
    Core(#[from] CoreError),
}
