//! # neurocam
//!
//! Brain MRI classification with visual explanations in Rust.
//!
//! neurocam instruments a trained image classifier to show which image regions
//! drove its decision:
//!
//! - **Capture**: one designated layer's activation and gradient per call
//! - **Saliency**: Grad-CAM++ (or Grad-CAM) maps normalized to `[0, 1]`
//! - **Rendering**: jet heatmap overlays and a bounding box around the
//!   largest salient region
//! - **Orchestration**: decode, classify, explain, render, encode per request
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use neurocam::prelude::*;
//!
//! type B = Autodiff<NdArray>;
//!
//! let config = ResNetConfig::resnet18(4);
//! let model = load_model(config.init::<B>(&device), "model.mpk", &device)?;
//!
//! let analyzer = Analyzer::new(model, InferenceConfig::default(), device)?;
//! let analysis = analyzer.analyze_bytes(&std::fs::read("scan.png")?)?;
//! println!("{} ({:.1}%)", analysis.prediction.label, analysis.prediction.confidence * 100.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `backend-ndarray` (default): CPU backend using ndarray

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export all crates
pub use neurocam_core as core;
pub use neurocam_explain as explain;
pub use neurocam_infer as infer;
pub use neurocam_models as models;
pub use neurocam_transforms as transforms;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use neurocam::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use neurocam_core::{
        ExecutionContext, ImageClassificationModel, ImageShape, ImageTensor, LayerObserver, Mode,
    };

    // Models
    pub use neurocam_models::{load_model, save_model, CheckpointMetadata, ResNet, ResNetConfig};

    // Explain
    pub use neurocam_explain::{AttributionMethod, SaliencyConfig, SaliencyEngine, SaliencyMap};

    // Transforms
    pub use neurocam_transforms::{
        BoundingBox, Normalization, Preprocessor, RenderConfig, Renderer,
    };

    // Inference
    pub use neurocam_infer::{
        Analysis, AnalysisPayload, Analyzer, ClassLabels, InferError, InferenceConfig,
    };
}

/// All module for importing everything.
pub mod all {
    pub use super::prelude::*;

    pub use neurocam_core::backend;
    pub use neurocam_explain::{
        grad_cam, grad_cam_pp, ActivationCapture, GradientCapture, LayerProbe,
    };
    pub use neurocam_transforms::{bounding_box_overlay, heatmap_overlay, jet, resize_map};
}
