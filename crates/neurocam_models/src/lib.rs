//! # neurocam_models
//!
//! Image classification networks for neurocam.
//!
//! ## CNN Models
//! - [`ResNet`] - residual network (ResNet-18/34 layouts) with named, observable layers
//!
//! Every model implements [`neurocam_core::ImageClassificationModel`], so any of
//! its observable layers can be instrumented by the saliency engine. Batch
//! normalization follows the [`neurocam_core::Mode`] of the execution context.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod cnn;
mod norm;
mod traits;

pub use checkpoint::{load_model, save_model, CheckpointError, CheckpointMetadata};
pub use cnn::*;
pub use norm::batch_norm_2d;
