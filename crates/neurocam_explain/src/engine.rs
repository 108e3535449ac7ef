//! Saliency engine: one forward/backward cycle per map.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use neurocam_core::{argmax, tensor_to_vec, CoreError, ExecutionContext, ImageClassificationModel};
use serde::{Deserialize, Serialize};

use crate::activation::LayerProbe;
use crate::attribution::{grad_cam, grad_cam_pp, AttributionMethod, SaliencyMap, DEFAULT_EPSILON};
use crate::error::{ExplainError, Result};

/// Configuration for saliency generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaliencyConfig {
    /// Name of the instrumented layer.
    pub target_layer: String,
    /// Weighting scheme.
    pub method: AttributionMethod,
    /// Stabilizer for the alpha denominator and the normalization.
    pub epsilon: f32,
}

impl Default for SaliencyConfig {
    fn default() -> Self {
        Self {
            target_layer: "layer4.1.conv2".to_string(),
            method: AttributionMethod::GradCamPlusPlus,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl SaliencyConfig {
    /// Grad-CAM++ on `target_layer`.
    pub fn new(target_layer: impl Into<String>) -> Self {
        Self {
            target_layer: target_layer.into(),
            ..Default::default()
        }
    }

    /// Set the weighting scheme.
    #[must_use]
    pub fn with_method(mut self, method: AttributionMethod) -> Self {
        self.method = method;
        self
    }
}

/// Produces saliency maps for single images.
///
/// The engine owns the capture buffers of its target layer, so one engine must
/// not be used by two computations at the same time (`generate` takes
/// `&mut self`).
#[derive(Debug)]
pub struct SaliencyEngine<B: AutodiffBackend> {
    config: SaliencyConfig,
    probe: LayerProbe<B>,
}

impl<B: AutodiffBackend> SaliencyEngine<B> {
    /// Create an engine for `config.target_layer`.
    pub fn new(config: SaliencyConfig) -> Self {
        let probe = LayerProbe::new(config.target_layer.clone());
        Self { config, probe }
    }

    /// Engine configuration.
    pub fn config(&self) -> &SaliencyConfig {
        &self.config
    }

    /// Capture buffers of the last call.
    pub fn probe(&self) -> &LayerProbe<B> {
        &self.probe
    }

    /// Generate a saliency map for `input`.
    ///
    /// Runs the forward pass with the target layer captured, selects the class
    /// (`class_index` or the argmax of the logits), differentiates that single
    /// logit and combines activation and gradient with the configured method.
    ///
    /// # Arguments
    ///
    /// * `model` - Classifier exposing the target layer
    /// * `ctx` - Execution context; must be in [`neurocam_core::Mode::Eval`]
    /// * `input` - Preprocessed image of shape (1, channels, height, width)
    /// * `class_index` - Class to explain; `None` explains the predicted class
    ///
    /// # Returns
    ///
    /// The map over the target layer's `(H, W)` grid and the explained class.
    pub fn generate<M>(
        &mut self,
        model: &M,
        ctx: &ExecutionContext<B>,
        input: Tensor<B, 4>,
        class_index: Option<usize>,
    ) -> Result<(SaliencyMap, usize)>
    where
        M: ImageClassificationModel<B> + ?Sized,
    {
        ctx.ensure_eval()?;

        let [batch, _, _, _] = input.dims();
        if batch != 1 {
            return Err(ExplainError::UnsupportedBatch(batch));
        }

        let target = self.config.target_layer.as_str();
        if !model.has_layer(target) {
            return Err(ExplainError::UnknownLayer {
                layer: target.to_string(),
                available: model.observable_layers().join(", "),
            });
        }

        self.probe.clear();
        let logits = model.forward_observed(input, ctx, self.probe.observer());

        let [_, n_classes] = logits.dims();
        let class = match class_index {
            Some(class) => class,
            None => {
                let scores = tensor_to_vec(logits.clone().detach())?;
                argmax(&scores).ok_or_else(|| CoreError::Other("empty logits".to_string()))?
            }
        };
        if class >= n_classes {
            return Err(ExplainError::ClassOutOfRange { class, n_classes });
        }

        let score = logits.slice([0..1, class..class + 1]).sum();
        let grads = score.backward();
        self.probe.record_gradients(&grads);

        let (activation, gradient) = self.probe.snapshot()?;
        let [_, channels, height, width] = activation.dims();
        tracing::debug!(
            layer = target,
            class,
            channels,
            height,
            width,
            "captured target layer"
        );

        let activation = activation.reshape([channels, height, width]);
        let gradient = gradient.reshape([channels, height, width]);
        let map = match self.config.method {
            AttributionMethod::GradCamPlusPlus => {
                grad_cam_pp(activation, gradient, class, self.config.epsilon)?
            }
            AttributionMethod::GradCam => grad_cam(activation, gradient, class, self.config.epsilon)?,
        };

        if map.is_degenerate() {
            tracing::warn!(layer = target, class, "saliency map has no positive evidence");
        }

        Ok((map, class))
    }
}
