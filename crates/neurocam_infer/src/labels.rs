//! Class labels and prediction from probabilities.

use std::collections::BTreeMap;

use neurocam_core::argmax;
use serde::{Deserialize, Serialize};

use crate::error::{InferError, Result};

/// Threshold on the sigmoid probability of a binary classifier.
const BINARY_THRESHOLD: f32 = 0.5;

/// Human-readable names of the model's outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabels {
    /// Single-logit classifier read through a sigmoid.
    Binary {
        /// Label when the probability exceeds 0.5.
        positive: String,
        /// Label otherwise.
        negative: String,
    },
    /// One logit per class, read through a softmax.
    MultiClass(Vec<String>),
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self::MultiClass(
            ["No Tumor", "Glioma", "Meningioma", "Pituitary"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

/// Classification outcome of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted label.
    pub label: String,
    /// Index of the label (binary: 0 negative, 1 positive).
    pub class_index: usize,
    /// Probability of the predicted label.
    pub confidence: f32,
    /// Probability of every label.
    pub probabilities: BTreeMap<String, f32>,
}

impl ClassLabels {
    /// Tumor / no-tumor labels for single-logit classifiers.
    pub fn binary() -> Self {
        Self::Binary {
            positive: "Tumor Detected".to_string(),
            negative: "No Tumor Detected".to_string(),
        }
    }

    /// Number of logits the model must produce.
    pub fn n_logits(&self) -> usize {
        match self {
            Self::Binary { .. } => 1,
            Self::MultiClass(names) => names.len(),
        }
    }

    /// Check the labels against a model with `n_classes` logits.
    pub fn validate(&self, n_classes: usize) -> Result<()> {
        if let Self::MultiClass(names) = self {
            if names.is_empty() {
                return Err(InferError::Configuration("no class labels".to_string()));
            }
        }
        if self.n_logits() != n_classes {
            return Err(InferError::Configuration(format!(
                "{} labels for a model with {} logits",
                self.n_logits(),
                n_classes
            )));
        }
        Ok(())
    }

    /// Logit the saliency map explains for a predicted class.
    ///
    /// A binary classifier has only logit 0.
    pub fn saliency_class(&self, class_index: usize) -> usize {
        match self {
            Self::Binary { .. } => 0,
            Self::MultiClass(_) => class_index,
        }
    }

    /// Turn model probabilities into a prediction.
    ///
    /// `probs` holds the sigmoid output for binary labels and the softmax
    /// output otherwise.
    pub fn predict(&self, probs: &[f32]) -> Result<Prediction> {
        if probs.len() != self.n_logits() {
            return Err(InferError::Configuration(format!(
                "{} probabilities for {} labels",
                probs.len(),
                self.n_logits()
            )));
        }

        match self {
            Self::Binary { positive, negative } => {
                let p = probs[0];
                let probabilities =
                    BTreeMap::from([(positive.clone(), p), (negative.clone(), 1.0 - p)]);
                let prediction = if p > BINARY_THRESHOLD {
                    Prediction {
                        label: positive.clone(),
                        class_index: 1,
                        confidence: p,
                        probabilities,
                    }
                } else {
                    Prediction {
                        label: negative.clone(),
                        class_index: 0,
                        confidence: 1.0 - p,
                        probabilities,
                    }
                };
                Ok(prediction)
            }
            Self::MultiClass(names) => {
                let class_index = argmax(probs)
                    .ok_or_else(|| InferError::Configuration("no class labels".to_string()))?;
                Ok(Prediction {
                    label: names[class_index].clone(),
                    class_index,
                    confidence: probs[class_index],
                    probabilities: names.iter().cloned().zip(probs.iter().copied()).collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels() {
        let labels = ClassLabels::default();
        assert_eq!(labels.n_logits(), 4);
        assert!(labels.validate(4).is_ok());
        assert!(labels.validate(2).is_err());
    }

    #[test]
    fn test_multiclass_prediction() {
        let labels = ClassLabels::default();
        let prediction = labels.predict(&[0.1, 0.2, 0.6, 0.1]).unwrap();
        assert_eq!(prediction.label, "Meningioma");
        assert_eq!(prediction.class_index, 2);
        assert_eq!(prediction.confidence, 0.6);
        assert_eq!(prediction.probabilities.len(), 4);
        assert_eq!(prediction.probabilities["Glioma"], 0.2);
        assert_eq!(labels.saliency_class(2), 2);
    }

    #[test]
    fn test_binary_positive() {
        let labels = ClassLabels::binary();
        let prediction = labels.predict(&[0.8]).unwrap();
        assert_eq!(prediction.label, "Tumor Detected");
        assert_eq!(prediction.class_index, 1);
        assert_eq!(prediction.confidence, 0.8);
        assert_eq!(labels.saliency_class(prediction.class_index), 0);
    }

    #[test]
    fn test_binary_negative_reports_complement() {
        let labels = ClassLabels::binary();
        let prediction = labels.predict(&[0.25]).unwrap();
        assert_eq!(prediction.label, "No Tumor Detected");
        assert_eq!(prediction.class_index, 0);
        assert_eq!(prediction.confidence, 0.75);
        assert_eq!(prediction.probabilities["Tumor Detected"], 0.25);
    }

    #[test]
    fn test_binary_threshold_is_strict() {
        let prediction = ClassLabels::binary().predict(&[0.5]).unwrap();
        assert_eq!(prediction.label, "No Tumor Detected");
    }

    #[test]
    fn test_probability_count_mismatch() {
        assert!(ClassLabels::binary().predict(&[0.2, 0.8]).is_err());
    }

    #[test]
    fn test_labels_serde() {
        let json = serde_json::to_string(&ClassLabels::binary()).unwrap();
        assert!(json.contains("binary"));
        let back: ClassLabels = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClassLabels::binary());

        let multi: ClassLabels = serde_json::from_str(r#"{"multi_class": ["a", "b"]}"#).unwrap();
        assert_eq!(multi.n_logits(), 2);
    }
}
