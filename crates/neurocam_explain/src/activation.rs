//! Activation and gradient capture utilities.
//!
//! [`ActivationCapture`] is a [`LayerObserver`] that intercepts one named layer:
//! it detaches the layer output, marks the copy as requiring gradient and hands
//! that copy back to the model, so the remainder of the forward pass is built on
//! a tracked leaf. After the backward pass [`GradientCapture`] reads the gradient
//! of every captured leaf. [`LayerProbe`] owns both buffers for the caller.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use neurocam_core::LayerObserver;

use crate::error::{ExplainError, Result};

/// Captured activations of one target layer, in forward order.
#[derive(Debug, Clone)]
pub struct ActivationCapture<B: AutodiffBackend> {
    /// Layer being captured.
    target: String,
    /// Tracked leaves, one per traversal of the target layer.
    activations: Vec<Tensor<B, 4>>,
}

impl<B: AutodiffBackend> ActivationCapture<B> {
    /// Create a new activation capture for `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            activations: Vec::new(),
        }
    }

    /// Name of the captured layer.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Get a captured activation by position.
    pub fn get(&self, index: usize) -> Option<&Tensor<B, 4>> {
        self.activations.get(index)
    }

    /// Iterate over captured activations.
    pub fn iter(&self) -> impl Iterator<Item = &Tensor<B, 4>> {
        self.activations.iter()
    }

    /// Number of captured activations.
    pub fn len(&self) -> usize {
        self.activations.len()
    }

    /// Check if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    /// Clear all stored activations.
    pub fn clear(&mut self) {
        self.activations.clear();
    }
}

impl<B: AutodiffBackend> LayerObserver<B> for ActivationCapture<B> {
    fn observe(&mut self, layer: &str, output: Tensor<B, 4>) -> Tensor<B, 4> {
        if layer != self.target {
            return output;
        }
        let leaf = output.detach().require_grad();
        self.activations.push(leaf.clone());
        leaf
    }
}

/// Captured gradients of one target layer, in capture order.
#[derive(Debug, Clone)]
pub struct GradientCapture<B: Backend> {
    gradients: Vec<Tensor<B, 4>>,
}

impl<B: Backend> GradientCapture<B> {
    /// Create a new gradient capture.
    pub fn new() -> Self {
        Self {
            gradients: Vec::new(),
        }
    }

    /// Store a gradient.
    pub fn store(&mut self, gradient: Tensor<B, 4>) {
        self.gradients.push(gradient);
    }

    /// Get a gradient by position.
    pub fn get(&self, index: usize) -> Option<&Tensor<B, 4>> {
        self.gradients.get(index)
    }

    /// Number of captured gradients.
    pub fn len(&self) -> usize {
        self.gradients.len()
    }

    /// Check if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }

    /// Clear all stored gradients.
    pub fn clear(&mut self) {
        self.gradients.clear();
    }
}

impl<B: Backend> Default for GradientCapture<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-owned capture buffers for one target layer.
///
/// Lifecycle per call: [`clear`](Self::clear), forward pass through
/// [`observer`](Self::observer), backward pass, then
/// [`record_gradients`](Self::record_gradients) and [`snapshot`](Self::snapshot).
/// The buffers keep their entries until the next `clear`.
#[derive(Debug, Clone)]
pub struct LayerProbe<B: AutodiffBackend> {
    activations: ActivationCapture<B>,
    gradients: GradientCapture<B::InnerBackend>,
}

impl<B: AutodiffBackend> LayerProbe<B> {
    /// Create a probe for `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            activations: ActivationCapture::new(target),
            gradients: GradientCapture::new(),
        }
    }

    /// Name of the probed layer.
    pub fn target(&self) -> &str {
        self.activations.target()
    }

    /// Empty both buffers.
    pub fn clear(&mut self) {
        self.activations.clear();
        self.gradients.clear();
    }

    /// The observer to pass to the model's forward pass.
    pub fn observer(&mut self) -> &mut ActivationCapture<B> {
        &mut self.activations
    }

    /// Read the gradient of every captured activation from `grads`.
    ///
    /// Activations that did not take part in the differentiated computation
    /// have no gradient and add nothing to the buffer.
    pub fn record_gradients(&mut self, grads: &B::Gradients) {
        for activation in self.activations.iter() {
            if let Some(gradient) = activation.grad(grads) {
                self.gradients.store(gradient);
            }
        }
    }

    /// Number of captured activations.
    pub fn activation_count(&self) -> usize {
        self.activations.len()
    }

    /// Number of captured gradients.
    pub fn gradient_count(&self) -> usize {
        self.gradients.len()
    }

    /// The single `(activation, gradient)` pair of the last pass.
    ///
    /// Both tensors are detached from gradient tracking.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::CaptureCount`] unless each buffer holds exactly one entry.
    pub fn snapshot(&self) -> Result<(Tensor<B::InnerBackend, 4>, Tensor<B::InnerBackend, 4>)> {
        let activation = match (self.activations.len(), self.activations.get(0)) {
            (1, Some(activation)) => activation.clone().inner(),
            (got, _) => {
                return Err(ExplainError::CaptureCount {
                    kind: "activation",
                    layer: self.target().to_string(),
                    got,
                })
            }
        };
        let gradient = match (self.gradients.len(), self.gradients.get(0)) {
            (1, Some(gradient)) => gradient.clone(),
            (got, _) => {
                return Err(ExplainError::CaptureCount {
                    kind: "gradient",
                    layer: self.target().to_string(),
                    got,
                })
            }
        };
        Ok((activation, gradient))
    }
}
