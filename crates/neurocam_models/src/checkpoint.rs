//! Model checkpointing and serialization utilities.
//!
//! Model weights are stored with Burn's named MessagePack recorder
//! (`*.mpk`); a JSON sidecar ([`CheckpointMetadata`]) records the architecture,
//! its configuration and the class labels the weights were trained with.
//!
//! # Example
//!
//! ```rust,ignore
//! use neurocam_models::{load_model, save_model, ResNetConfig};
//!
//! let config = ResNetConfig::resnet18(4);
//! let model = config.init::<NdArray>(&device);
//! save_model(&model, "model.mpk")?;
//!
//! let loaded = load_model(config.init::<NdArray>(&device), "model.mpk", &device)?;
//! ```

use std::collections::HashMap;
use std::path::Path;

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{de::DeserializeOwned, Serialize};

/// Save a model to a checkpoint file.
///
/// The recorder sets the `.mpk` extension on `path`.
pub fn save_model<B, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
    B: Backend,
    M: Module<B>,
{
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path.as_ref().to_path_buf(), &recorder)
        .map_err(|e| CheckpointError::Save(format!("{:?}", e)))
}

/// Load checkpoint weights into `model`.
///
/// `model` provides the architecture; its weights are replaced.
pub fn load_model<B, M>(model: M, path: impl AsRef<Path>, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    if !path.with_extension("mpk").exists() {
        return Err(CheckpointError::Load(format!(
            "checkpoint not found: {}",
            path.display()
        )));
    }
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(path.to_path_buf(), &recorder, device)
        .map_err(|e| CheckpointError::Load(format!("{:?}", e)))
}

/// Model checkpoint metadata.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CheckpointMetadata {
    /// Model architecture name.
    pub arch: String,
    /// Model configuration as JSON.
    pub config_json: String,
    /// Class labels in logit order.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Additional metadata.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl CheckpointMetadata {
    /// Create new metadata for a model.
    pub fn new(arch: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            config_json: String::new(),
            labels: Vec::new(),
            extra: HashMap::new(),
        }
    }

    /// Set the config JSON.
    pub fn with_config<C: Serialize>(mut self, config: &C) -> Result<Self> {
        self.config_json =
            serde_json::to_string(config).map_err(|e| CheckpointError::Save(e.to_string()))?;
        Ok(self)
    }

    /// Set the class labels.
    #[must_use]
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Add extra metadata.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Decode the stored model configuration.
    pub fn config<C: DeserializeOwned>(&self) -> Result<C> {
        serde_json::from_str(&self.config_json)
            .map_err(|e| CheckpointError::InvalidFormat(format!("config_json: {}", e)))
    }

    /// Save metadata to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::Save(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| CheckpointError::Save(e.to_string()))?;
        Ok(())
    }

    /// Load metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json =
            std::fs::read_to_string(path).map_err(|e| CheckpointError::Load(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::Load(e.to_string()))
    }
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Checkpoint-related errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Error saving checkpoint.
    #[error("Failed to save checkpoint: {0}")]
    Save(String),

    /// Error loading checkpoint.
    #[error("Failed to load checkpoint: {0}")]
    Load(String),

    /// Invalid format.
    #[error("Invalid checkpoint format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnn::ResNetConfig;
    use neurocam_core::backend::NdArray;
    use neurocam_core::{tensor_to_vec, ExecutionContext, ImageClassificationModel};

    type TestBackend = NdArray;

    #[test]
    fn test_checkpoint_metadata() {
        let meta = CheckpointMetadata::new("ResNet")
            .with_config(&ResNetConfig::resnet18(4))
            .unwrap()
            .with_labels(["No Tumor", "Glioma", "Meningioma", "Pituitary"])
            .with_extra("dataset", "brain-mri");

        assert_eq!(meta.arch, "ResNet");
        assert_eq!(meta.labels.len(), 4);
        assert_eq!(meta.extra.get("dataset"), Some(&"brain-mri".to_string()));

        let config: ResNetConfig = meta.config().unwrap();
        assert_eq!(config, ResNetConfig::resnet18(4));
    }

    #[test]
    fn test_checkpoint_metadata_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let meta = CheckpointMetadata::new("ResNet").with_labels(["a", "b"]);

        meta.save(&path).unwrap();
        assert_eq!(CheckpointMetadata::load(&path).unwrap(), meta);
    }

    #[test]
    fn test_save_and_load_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mpk");
        let ctx = ExecutionContext::<TestBackend>::default();
        let config = ResNetConfig::tiny(2);

        let model = config.init::<TestBackend>(ctx.device());
        save_model(&model, &path).unwrap();

        let fresh = config.init::<TestBackend>(ctx.device());
        let loaded = load_model(fresh, &path, ctx.device()).unwrap();

        let x = Tensor::<TestBackend, 4>::ones([1, 3, 64, 64], ctx.device());
        let expected = tensor_to_vec(model.forward(x.clone(), &ctx)).unwrap();
        let got = tensor_to_vec(loaded.forward(x, &ctx)).unwrap();
        for (a, b) in expected.iter().zip(got.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_missing_checkpoint() {
        let model = ResNetConfig::tiny(2).init::<TestBackend>(&Default::default());
        let result = load_model(model, "/nonexistent/model.mpk", &Default::default());
        assert!(matches!(result, Err(CheckpointError::Load(_))));
    }
}
