//! Model capability traits.
//!
//! Defines the minimum surface the saliency engine and the inference
//! orchestrator need from an image classifier.

use burn::prelude::*;
use burn::tensor::activation::{sigmoid, softmax};

use crate::context::ExecutionContext;
use crate::observer::{LayerObserver, NoopObserver};
use crate::shape::ImageShape;

/// Trait for image classification models.
///
/// A model with `n_classes() == 1` is a binary classifier producing a single
/// logit; its probability is the sigmoid of that logit. Any other model
/// produces one logit per class and is read through a softmax.
pub trait ImageClassificationModel<B: Backend>: Send {
    /// Shape of a single input image.
    fn input_shape(&self) -> ImageShape;

    /// Number of output logits.
    fn n_classes(&self) -> usize;

    /// Names of the layers passed to a [`LayerObserver`] during a forward pass,
    /// in traversal order.
    fn observable_layers(&self) -> Vec<String>;

    /// Forward pass reporting every observable layer to `observer`.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape (batch, channels, height, width)
    /// * `ctx` - Execution context; its mode selects batch-norm behavior
    /// * `observer` - Receives each named layer output
    ///
    /// # Returns
    ///
    /// Logits tensor of shape (batch, n_classes)
    fn forward_observed(
        &self,
        x: Tensor<B, 4>,
        ctx: &ExecutionContext<B>,
        observer: &mut dyn LayerObserver<B>,
    ) -> Tensor<B, 2>;

    /// Forward pass returning logits.
    fn forward(&self, x: Tensor<B, 4>, ctx: &ExecutionContext<B>) -> Tensor<B, 2> {
        self.forward_observed(x, ctx, &mut NoopObserver)
    }

    /// Forward pass returning probabilities.
    ///
    /// Sigmoid for single-logit binary classifiers, softmax otherwise.
    fn forward_probs(&self, x: Tensor<B, 4>, ctx: &ExecutionContext<B>) -> Tensor<B, 2> {
        let logits = self.forward(x, ctx);
        if self.n_classes() == 1 {
            sigmoid(logits)
        } else {
            softmax(logits, 1)
        }
    }

    /// Check whether `layer` is one of the observable layers.
    fn has_layer(&self, layer: &str) -> bool {
        self.observable_layers().iter().any(|name| name == layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NdArray;
    use crate::tensor::tensor_to_vec;

    type TestBackend = NdArray;

    /// Global mean of the input scaled per class.
    struct MeanModel {
        scales: Vec<f32>,
    }

    impl<B: Backend> ImageClassificationModel<B> for MeanModel {
        fn input_shape(&self) -> ImageShape {
            ImageShape::new(1, 2, 2)
        }

        fn n_classes(&self) -> usize {
            self.scales.len()
        }

        fn observable_layers(&self) -> Vec<String> {
            vec!["input".to_string()]
        }

        fn forward_observed(
            &self,
            x: Tensor<B, 4>,
            ctx: &ExecutionContext<B>,
            observer: &mut dyn LayerObserver<B>,
        ) -> Tensor<B, 2> {
            let x = observer.observe("input", x);
            let [batch, _, _, _] = x.dims();
            let mean = x.mean_dim(3).mean_dim(2).mean_dim(1).reshape([batch, 1]);
            let scales = Tensor::<B, 1>::from_floats(self.scales.as_slice(), ctx.device())
                .reshape([1, self.scales.len()]);
            mean * scales
        }
    }

    #[test]
    fn test_forward_probs_softmax() {
        let ctx = ExecutionContext::<TestBackend>::default();
        let model = MeanModel {
            scales: vec![1.0, 2.0, 3.0],
        };
        let x = Tensor::<TestBackend, 4>::ones([1, 1, 2, 2], ctx.device());
        let probs = tensor_to_vec(model.forward_probs(x, &ctx)).unwrap();

        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_forward_probs_sigmoid_for_single_logit() {
        let ctx = ExecutionContext::<TestBackend>::default();
        let model = MeanModel { scales: vec![1.0] };
        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], ctx.device());
        let probs = tensor_to_vec(model.forward_probs(x, &ctx)).unwrap();

        assert_eq!(probs.len(), 1);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_has_layer() {
        let model = MeanModel { scales: vec![1.0] };
        assert!(ImageClassificationModel::<TestBackend>::has_layer(&model, "input"));
        assert!(!ImageClassificationModel::<TestBackend>::has_layer(&model, "fc"));
    }
}
