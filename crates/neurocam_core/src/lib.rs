//! # neurocam_core
//!
//! Core types and traits for neurocam brain MRI classification and saliency.
//!
//! This crate provides:
//! - [`ExecutionContext`] carrying the device and the network [`Mode`]
//! - [`ImageShape`] for `(C, H, W)` image and feature-map shape metadata
//! - [`ImageTensor`] wrapper for Burn tensors with shape validation
//! - [`LayerObserver`] for instrumenting named layers during a forward pass
//! - [`ImageClassificationModel`], the capability every classifier exposes
//! - Error types and common utilities
//!
//! ## Shape Convention
//!
//! Image data follows the convention `(B, C, H, W)`:
//! - `B`: Batch size (the saliency path only supports `B = 1`)
//! - `C`: Channels
//! - `H`: Height in pixels
//! - `W`: Width in pixels
//!
//! ## Example
//!
//! ```rust,ignore
//! use neurocam_core::{ExecutionContext, ImageShape};
//!
//! let ctx = ExecutionContext::<NdArray>::inference(Default::default());
//! let shape = ImageShape::new(3, 224, 224);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod error;
mod model_trait;
mod observer;
mod shape;
mod tensor;

pub use context::{ExecutionContext, Mode};
pub use error::{CoreError, Result};
pub use model_trait::ImageClassificationModel;
pub use observer::{LayerObserver, NoopObserver};
pub use shape::ImageShape;
pub use tensor::{argmax, tensor_to_vec, ImageTensor};

/// Backend type aliases for convenience
pub mod backend {
    #[cfg(feature = "backend-ndarray")]
    pub use burn_ndarray::NdArray;
}
