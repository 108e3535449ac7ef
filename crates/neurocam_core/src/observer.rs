//! Layer observers for instrumenting a forward pass.

use burn::prelude::*;

/// Observer invoked by a model for every named layer a forward pass traverses.
///
/// The observer receives the layer output and returns the tensor the rest of
/// the forward pass continues with. Returning the input unchanged leaves the
/// computation untouched; an observer may instead substitute an equivalent
/// tensor (for example a detached copy that tracks its own gradient).
///
/// # Example
///
/// ```rust,ignore
/// use neurocam_core::LayerObserver;
///
/// struct ShapeLogger;
///
/// impl<B: Backend> LayerObserver<B> for ShapeLogger {
///     fn observe(&mut self, layer: &str, output: Tensor<B, 4>) -> Tensor<B, 4> {
///         println!("{}: {:?}", layer, output.dims());
///         output
///     }
/// }
/// ```
pub trait LayerObserver<B: Backend> {
    /// Observe the output of `layer`.
    fn observe(&mut self, layer: &str, output: Tensor<B, 4>) -> Tensor<B, 4>;
}

/// Observer that passes every layer output through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<B: Backend> LayerObserver<B> for NoopObserver {
    fn observe(&mut self, _layer: &str, output: Tensor<B, 4>) -> Tensor<B, 4> {
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NdArray;

    type TestBackend = NdArray;

    #[derive(Default)]
    struct Recorder {
        layers: Vec<String>,
    }

    impl<B: Backend> LayerObserver<B> for Recorder {
        fn observe(&mut self, layer: &str, output: Tensor<B, 4>) -> Tensor<B, 4> {
            self.layers.push(layer.to_string());
            output
        }
    }

    #[test]
    fn test_noop_observer_passes_through() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 2, 3, 3], &device);
        let y = LayerObserver::<TestBackend>::observe(&mut NoopObserver, "conv", x);
        assert_eq!(y.dims(), [1, 2, 3, 3]);
    }

    #[test]
    fn test_observer_as_trait_object() {
        let device = Default::default();
        let mut recorder = Recorder::default();
        {
            let observer: &mut dyn LayerObserver<TestBackend> = &mut recorder;
            let x = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);
            let x = observer.observe("a", x);
            let _ = observer.observe("b", x);
        }
        assert_eq!(recorder.layers, vec!["a", "b"]);
    }
}
