//! # neurocam_infer
//!
//! Per-request orchestration of classification and explanation.
//!
//! An [`Analyzer`] owns one model and its saliency engine. Each request runs:
//! decode, preprocess, forward pass for probabilities, class selection,
//! saliency for the predicted class, overlay rendering. The result is an
//! [`Analysis`], convertible into a transport [`AnalysisPayload`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use neurocam_infer::{Analyzer, InferenceConfig};
//!
//! let analyzer = Analyzer::new(model, InferenceConfig::default(), device)?;
//! let analysis = analyzer.analyze_bytes(&bytes)?;
//! let json = serde_json::to_string(&analysis.to_payload()?)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod analyzer;
mod config;
mod error;
mod labels;
mod payload;

pub use analyzer::{Analysis, Analyzer};
pub use config::{InferenceConfig, DEFAULT_MAX_PAYLOAD_BYTES};
pub use error::{InferError, Result};
pub use labels::{ClassLabels, Prediction};
pub use payload::{encode_png, AnalysisPayload};
