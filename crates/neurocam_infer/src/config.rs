//! Inference configuration.

use std::path::Path;

use neurocam_explain::SaliencyConfig;
use neurocam_transforms::{Normalization, RenderConfig};
use serde::{Deserialize, Serialize};

use crate::error::{InferError, Result};
use crate::labels::ClassLabels;

/// Largest accepted encoded image, in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Everything an [`crate::Analyzer`] needs besides the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Target layer and attribution method.
    pub saliency: SaliencyConfig,
    /// Bounding-box options.
    pub render: RenderConfig,
    /// Input normalization matching the model's training.
    pub normalization: Normalization,
    /// Output labels.
    pub labels: ClassLabels,
    /// Requests above this size are rejected before decoding.
    pub max_payload_bytes: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            saliency: SaliencyConfig::default(),
            render: RenderConfig::default(),
            normalization: Normalization::imagenet(),
            labels: ClassLabels::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl InferenceConfig {
    /// Single-logit tumor classifier with inputs mapped to `[-1, 1]`.
    pub fn binary() -> Self {
        Self {
            normalization: Normalization::symmetric(),
            labels: ClassLabels::binary(),
            ..Default::default()
        }
    }

    /// Set the target layer.
    #[must_use]
    pub fn with_target_layer(mut self, layer: impl Into<String>) -> Self {
        self.saliency.target_layer = layer.into();
        self
    }

    /// Set the labels.
    #[must_use]
    pub fn with_labels(mut self, labels: ClassLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| InferError::Configuration(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| InferError::Configuration(format!("{}: {e}", path.display())))
    }

    /// Save as pretty-printed JSON.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| InferError::Configuration(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| InferError::Configuration(format!("{}: {e}", path.display())))
    }
}
