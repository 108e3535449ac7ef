//! # neurocam_transforms
//!
//! Image transforms on both sides of the saliency engine.
//!
//! This crate provides:
//! - Preprocessing: decode, resize to the network input, per-channel normalize
//! - Map resampling (bilinear) and the jet colormap
//! - Heatmap overlays (fixed 0.6 / 0.4 blend)
//! - Bounding-box overlays around the largest high-saliency region
//!
//! ## Example
//!
//! ```rust,ignore
//! use neurocam_transforms::{Normalization, Preprocessor, RenderConfig, Renderer};
//!
//! let image = Preprocessor::decode(&bytes)?;
//! let input = Preprocessor::new(shape, Normalization::imagenet()).to_tensor(&image, &device)?;
//! let overlays = Renderer::new(RenderConfig::default()).render(&image.to_rgb8(), map.values());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod colormap;
mod error;
pub mod overlay;
pub mod preprocess;

pub use colormap::{jet, resize_map};
pub use error::{Result, TransformError};
pub use overlay::{
    bounding_box_overlay, heatmap_overlay, largest_region, BoundingBox, Overlays, RenderConfig,
    Renderer, HEATMAP_COLOR_WEIGHT, HEATMAP_IMAGE_WEIGHT,
};
pub use preprocess::{Normalization, Preprocessor};
