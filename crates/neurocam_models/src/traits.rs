//! Trait implementations for the saliency engine and the orchestrator.
//!
//! Implements `ImageClassificationModel` for all classification models.

use burn::prelude::*;
use neurocam_core::{ExecutionContext, ImageClassificationModel, ImageShape, LayerObserver};

use crate::cnn::ResNet;

impl<B: Backend> ImageClassificationModel<B> for ResNet<B> {
    fn input_shape(&self) -> ImageShape {
        self.input_shape()
    }

    fn n_classes(&self) -> usize {
        self.n_classes()
    }

    fn observable_layers(&self) -> Vec<String> {
        self.observable_layers()
    }

    fn forward_observed(
        &self,
        x: Tensor<B, 4>,
        ctx: &ExecutionContext<B>,
        observer: &mut dyn LayerObserver<B>,
    ) -> Tensor<B, 2> {
        self.forward_observed(x, ctx, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnn::ResNetConfig;
    use neurocam_core::backend::NdArray;
    use neurocam_core::tensor_to_vec;

    type TestBackend = NdArray;

    fn as_classifier<M: ImageClassificationModel<TestBackend>>(model: &M) -> &M {
        model
    }

    #[test]
    fn test_resnet_is_classifier() {
        let ctx = ExecutionContext::<TestBackend>::default();
        let model = ResNetConfig::tiny(4).init::<TestBackend>(ctx.device());
        let model = as_classifier(&model);

        assert!(model.has_layer("layer4.0.conv2"));
        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 64], ctx.device());
        let probs = tensor_to_vec(ImageClassificationModel::forward_probs(model, x, &ctx)).unwrap();
        assert_eq!(probs.len(), 4);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }
}
