//! # neurocam_explain
//!
//! Explainability tools for neurocam: activation/gradient capture, saliency maps.
//!
//! This crate provides:
//! - Activation capture on one designated layer during the forward pass
//! - Gradient capture for that layer from the backward pass
//! - Grad-CAM++ (and plain Grad-CAM) saliency maps normalized to `[0, 1]`
//! - [`SaliencyEngine`], which runs the full forward/backward/combine cycle
//!
//! ## Example
//!
//! ```rust,ignore
//! use neurocam_explain::{SaliencyConfig, SaliencyEngine};
//!
//! let mut engine = SaliencyEngine::new(SaliencyConfig::new("layer4.1.conv2"));
//! let (map, class) = engine.generate(&model, &ctx, input, None)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod activation;
mod attribution;
mod engine;
mod error;

pub use activation::{ActivationCapture, GradientCapture, LayerProbe};
pub use attribution::{
    grad_cam, grad_cam_pp, grad_cam_pp_alpha, grad_cam_pp_weights, grad_cam_weights,
    normalize_unit_interval, weighted_activation_sum, AttributionMethod, SaliencyMap,
    DEFAULT_EPSILON,
};
pub use engine::{SaliencyConfig, SaliencyEngine};
pub use error::{ExplainError, Result};
