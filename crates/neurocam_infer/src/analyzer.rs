//! Request orchestration.

use burn::tensor::backend::AutodiffBackend;
use image::{DynamicImage, RgbImage};
use neurocam_core::{tensor_to_vec, ExecutionContext, ImageClassificationModel};
use neurocam_explain::{SaliencyEngine, SaliencyMap};
use neurocam_transforms::{Overlays, Preprocessor, Renderer};
use parking_lot::Mutex;

use crate::config::InferenceConfig;
use crate::error::{InferError, Result};
use crate::labels::{ClassLabels, Prediction};
use crate::payload::AnalysisPayload;

/// Result of one request.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Label, confidence and probabilities.
    pub prediction: Prediction,
    /// Decoded input at its original resolution.
    pub original: RgbImage,
    /// Heatmap and bounding-box overlays on `original`.
    pub overlays: Overlays,
    /// The saliency map at the target layer's resolution.
    pub saliency: SaliencyMap,
}

impl Analysis {
    /// Encode for transport.
    pub fn to_payload(&self) -> Result<AnalysisPayload> {
        AnalysisPayload::from_analysis(self)
    }
}

/// Model and capture buffers; used by one request at a time.
struct Session<B: AutodiffBackend, M> {
    model: M,
    engine: SaliencyEngine<B>,
}

/// Classifies images and explains each prediction.
///
/// Requests are serialized on an internal lock because the saliency engine's
/// capture buffers belong to the single model instance. Share an `Analyzer`
/// behind an `Arc`, or build one per worker for parallel throughput.
pub struct Analyzer<B: AutodiffBackend, M: ImageClassificationModel<B>> {
    session: Mutex<Session<B, M>>,
    ctx: ExecutionContext<B>,
    preprocessor: Preprocessor,
    renderer: Renderer,
    labels: ClassLabels,
    n_classes: usize,
    max_payload_bytes: usize,
}

impl<B, M> Analyzer<B, M>
where
    B: AutodiffBackend,
    M: ImageClassificationModel<B>,
{
    /// Wire `model` with `config` on `device`.
    ///
    /// # Errors
    ///
    /// [`InferError::Configuration`] if the labels do not match the model's
    /// logits or the target layer is not observable on the model.
    pub fn new(model: M, config: InferenceConfig, device: B::Device) -> Result<Self> {
        let n_classes = model.n_classes();
        config.labels.validate(n_classes)?;

        let target = &config.saliency.target_layer;
        if !model.has_layer(target) {
            return Err(InferError::Configuration(format!(
                "target layer '{}' not found (available: {})",
                target,
                model.observable_layers().join(", ")
            )));
        }

        let preprocessor = Preprocessor::new(model.input_shape(), config.normalization);
        tracing::info!(
            target_layer = %target,
            method = ?config.saliency.method,
            n_classes,
            input = %model.input_shape(),
            "analyzer ready"
        );

        Ok(Self {
            session: Mutex::new(Session {
                model,
                engine: SaliencyEngine::new(config.saliency),
            }),
            ctx: ExecutionContext::inference(device),
            preprocessor,
            renderer: Renderer::new(config.render),
            labels: config.labels,
            n_classes,
            max_payload_bytes: config.max_payload_bytes,
        })
    }

    /// Output labels.
    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Execution context used for every request.
    pub fn context(&self) -> &ExecutionContext<B> {
        &self.ctx
    }

    /// Largest accepted encoded image.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Analyze an encoded image (PNG, JPEG).
    ///
    /// # Errors
    ///
    /// [`InferError::PayloadTooLarge`] before decoding if `bytes` exceeds the
    /// limit, [`InferError::InvalidImage`] if decoding fails.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<Analysis> {
        self.analyze_bytes_with_class(bytes, None)
    }

    /// [`analyze_bytes`](Self::analyze_bytes) with an explicit class to explain.
    pub fn analyze_bytes_with_class(
        &self,
        bytes: &[u8],
        explain_class: Option<usize>,
    ) -> Result<Analysis> {
        if bytes.len() > self.max_payload_bytes {
            return Err(InferError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.max_payload_bytes,
            });
        }
        let image = Preprocessor::decode(bytes)?;
        self.analyze_with_class(&image, explain_class)
    }

    /// Analyze a decoded image, explaining the predicted class.
    pub fn analyze(&self, image: &DynamicImage) -> Result<Analysis> {
        self.analyze_with_class(image, None)
    }

    /// Analyze a decoded image.
    ///
    /// `explain_class` selects the logit to explain; `None` explains the
    /// prediction.
    pub fn analyze_with_class(
        &self,
        image: &DynamicImage,
        explain_class: Option<usize>,
    ) -> Result<Analysis> {
        let input = self
            .preprocessor
            .to_tensor::<B>(image, self.ctx.device())?
            .into_inner();

        let (prediction, saliency) = {
            let mut session = self.session.lock();
            let Session { model, engine } = &mut *session;

            let probs = tensor_to_vec(model.forward_probs(input.clone(), &self.ctx).detach())
                .map_err(|e| {
                    tracing::error!(error = %e, "reading probabilities failed");
                    InferError::Processing("classification")
                })?;
            let prediction = self.labels.predict(&probs)?;

            let class = match explain_class {
                Some(class) if class >= self.n_classes => {
                    return Err(InferError::InvalidClass {
                        class,
                        n_classes: self.n_classes,
                    })
                }
                Some(class) => class,
                None => self.labels.saliency_class(prediction.class_index),
            };
            let (saliency, _) = engine.generate(&*model, &self.ctx, input, Some(class))?;
            (prediction, saliency)
        };

        let original = image.to_rgb8();
        let overlays = self.renderer.render(&original, saliency.values());

        tracing::info!(
            label = %prediction.label,
            confidence = prediction.confidence,
            explained_class = saliency.target_class(),
            region = ?overlays.region,
            "analysis complete"
        );

        Ok(Analysis {
            prediction,
            original,
            overlays,
            saliency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use image::Rgb;
    use neurocam_core::backend::NdArray;
    use neurocam_models::{ResNet, ResNetConfig};

    type TestBackend = Autodiff<NdArray>;

    fn tiny_analyzer(config: InferenceConfig, n_classes: usize) -> Analyzer<TestBackend, ResNet<TestBackend>> {
        let device = Default::default();
        let model_config = ResNetConfig::tiny(n_classes);
        let model = model_config.init::<TestBackend>(&device);
        let config = config.with_target_layer(model_config.default_target_layer());
        Analyzer::new(model, config, device).unwrap()
    }

    fn scan() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(40, 30, |x, y| {
            Rgb([(x * 6) as u8, (y * 8) as u8, ((x * y) % 256) as u8])
        }))
    }

    #[test]
    fn test_multiclass_analysis() {
        let analyzer = tiny_analyzer(InferenceConfig::default(), 4);
        let analysis = analyzer.analyze(&scan()).unwrap();

        let prediction = &analysis.prediction;
        assert!(prediction.class_index < 4);
        assert_eq!(prediction.probabilities.len(), 4);
        let total: f32 = prediction.probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert_eq!(analysis.saliency.target_class(), prediction.class_index);

        assert_eq!(analysis.original.dimensions(), (40, 30));
        assert_eq!(analysis.overlays.heatmap.dimensions(), (40, 30));
        assert_eq!(analysis.overlays.bounding_box.dimensions(), (40, 30));
    }

    #[test]
    fn test_binary_analysis_explains_logit_zero() {
        let analyzer = tiny_analyzer(InferenceConfig::binary(), 1);
        let analysis = analyzer.analyze(&scan()).unwrap();

        let label = analysis.prediction.label.as_str();
        assert!(label == "Tumor Detected" || label == "No Tumor Detected");
        assert!(analysis.prediction.confidence >= 0.5);
        assert_eq!(analysis.saliency.target_class(), 0);
    }

    #[test]
    fn test_explicit_class() {
        let analyzer = tiny_analyzer(InferenceConfig::default(), 4);
        let analysis = analyzer.analyze_with_class(&scan(), Some(3)).unwrap();
        assert_eq!(analysis.saliency.target_class(), 3);

        let result = analyzer.analyze_with_class(&scan(), Some(4));
        assert!(matches!(result, Err(InferError::InvalidClass { class: 4, .. })));
    }

    #[test]
    fn test_payload_too_large_rejected_before_decode() {
        let config = InferenceConfig {
            max_payload_bytes: 16,
            ..Default::default()
        };
        let analyzer = tiny_analyzer(config, 4);
        let result = analyzer.analyze_bytes(&[0u8; 17]);
        assert!(matches!(
            result,
            Err(InferError::PayloadTooLarge { size: 17, limit: 16 })
        ));
    }

    #[test]
    fn test_garbage_bytes_are_invalid_image() {
        let analyzer = tiny_analyzer(InferenceConfig::default(), 4);
        let result = analyzer.analyze_bytes(b"not an image at all");
        assert!(matches!(result, Err(InferError::InvalidImage(_))));
    }

    #[test]
    fn test_label_mismatch_is_configuration_error() {
        let device = Default::default();
        let model = ResNetConfig::tiny(2).init::<TestBackend>(&device);
        let config = InferenceConfig::default().with_target_layer("layer4.0.conv2");
        let result = Analyzer::new(model, config, device);
        assert!(matches!(result, Err(InferError::Configuration(_))));
    }

    #[test]
    fn test_unknown_target_layer_is_configuration_error() {
        let device = Default::default();
        let model = ResNetConfig::tiny(4).init::<TestBackend>(&device);
        let config = InferenceConfig::default().with_target_layer("layer9.0.conv2");
        let result = Analyzer::new(model, config, device);
        assert!(matches!(result, Err(InferError::Configuration(_))));
    }

    #[test]
    fn test_analyzer_is_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<Analyzer<TestBackend, ResNet<TestBackend>>>();
    }
}
