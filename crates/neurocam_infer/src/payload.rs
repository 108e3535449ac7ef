//! Transport encoding of an analysis.

use std::collections::BTreeMap;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{ImageFormat, RgbImage};
use neurocam_transforms::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::analyzer::Analysis;
use crate::error::{InferError, Result};

/// Encode an image as PNG.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| {
            tracing::error!(error = %e, "png encoding failed");
            InferError::Processing("png encoding")
        })?;
    Ok(bytes)
}

/// JSON-ready response: prediction plus base64-encoded PNG overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Predicted label.
    pub prediction: String,
    /// Probability of the predicted label.
    pub confidence: f32,
    /// Predicted class index.
    pub class_index: usize,
    /// Probability per label.
    pub probabilities: BTreeMap<String, f32>,
    /// Outlined region in original-image pixels.
    pub region: Option<BoundingBox>,
    /// Original image, PNG, base64.
    pub original_image: String,
    /// Heatmap overlay, PNG, base64.
    pub heatmap_image: String,
    /// Bounding-box overlay, PNG, base64.
    pub bounding_box_image: String,
}

impl AnalysisPayload {
    /// Encode `analysis` for transport.
    pub fn from_analysis(analysis: &Analysis) -> Result<Self> {
        let encode = |image: &RgbImage| encode_png(image).map(|png| STANDARD.encode(png));
        Ok(Self {
            prediction: analysis.prediction.label.clone(),
            confidence: analysis.prediction.confidence,
            class_index: analysis.prediction.class_index,
            probabilities: analysis.prediction.probabilities.clone(),
            region: analysis.overlays.region,
            original_image: encode(&analysis.original)?,
            heatmap_image: encode(&analysis.overlays.heatmap)?,
            bounding_box_image: encode(&analysis.overlays.bounding_box)?,
        })
    }

    /// Decode one of the base64 PNG fields back to bytes.
    pub fn decode_image(field: &str) -> Result<Vec<u8>> {
        STANDARD
            .decode(field)
            .map_err(|e| InferError::InvalidImage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_png_roundtrip_through_base64() {
        let image = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        let encoded = STANDARD.encode(encode_png(&image).unwrap());

        let bytes = AnalysisPayload::decode_image(&encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(AnalysisPayload::decode_image("not base64!").is_err());
    }
}
