//! Error types for neurocam_transforms.

use neurocam_core::CoreError;
use thiserror::Error;

/// Result type alias using [`TransformError`].
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors raised while preparing images.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The image or target size has a zero dimension.
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// The network expects a channel count other than 1 or 3.
    #[error("Unsupported channel count {0}: expected 1 (grayscale) or 3 (RGB)")]
    UnsupportedChannels(usize),

    /// Tensor construction failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}
