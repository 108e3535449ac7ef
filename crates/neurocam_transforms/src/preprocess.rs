//! Image preprocessing: decode, resize, normalize.

use burn::prelude::*;
use image::imageops::FilterType;
use image::DynamicImage;
use neurocam_core::{ImageShape, ImageTensor};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// Per-channel normalization `(x - mean) / std` applied to values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    /// Channel means (R, G, B).
    pub mean: [f32; 3],
    /// Channel standard deviations (R, G, B).
    pub std: [f32; 3],
}

impl Default for Normalization {
    fn default() -> Self {
        Self::imagenet()
    }
}

impl Normalization {
    /// ImageNet statistics, used by networks fine-tuned from ImageNet weights.
    pub const fn imagenet() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }

    /// Maps `[0, 1]` to `[-1, 1]` on every channel.
    pub const fn symmetric() -> Self {
        Self {
            mean: [0.5; 3],
            std: [0.5; 3],
        }
    }

    /// Normalize a single value of `channel`.
    #[inline]
    pub fn apply(&self, channel: usize, value: f32) -> f32 {
        (value - self.mean[channel]) / self.std[channel]
    }
}

/// Turns decoded images into network input tensors.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    shape: ImageShape,
    normalization: Normalization,
}

impl Preprocessor {
    /// Create a preprocessor for inputs of `shape` (1 or 3 channels).
    pub fn new(shape: ImageShape, normalization: Normalization) -> Self {
        Self {
            shape,
            normalization,
        }
    }

    /// Network input shape.
    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Normalization in use.
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Decode an encoded image (PNG, JPEG).
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Decode`] for undecodable bytes and
    /// [`TransformError::InvalidDimensions`] for an empty image.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        let image = image::load_from_memory(bytes)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TransformError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(image)
    }

    /// Resize and normalize `image` into channel-major `(C, H, W)` values.
    pub fn to_values(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let width = self.shape.width() as u32;
        let height = self.shape.height() as u32;
        if width == 0 || height == 0 {
            return Err(TransformError::InvalidDimensions { width, height });
        }

        let plane = self.shape.height() * self.shape.width();
        let mut values = vec![0.0f32; self.shape.numel()];
        match self.shape.channels() {
            3 => {
                let resized =
                    image::imageops::resize(&image.to_rgb8(), width, height, FilterType::Triangle);
                for (i, pixel) in resized.pixels().enumerate() {
                    for c in 0..3 {
                        let v = f32::from(pixel[c]) / 255.0;
                        values[c * plane + i] = self.normalization.apply(c, v);
                    }
                }
            }
            1 => {
                let resized =
                    image::imageops::resize(&image.to_luma8(), width, height, FilterType::Triangle);
                for (i, pixel) in resized.pixels().enumerate() {
                    values[i] = self.normalization.apply(0, f32::from(pixel[0]) / 255.0);
                }
            }
            other => return Err(TransformError::UnsupportedChannels(other)),
        }
        Ok(values)
    }

    /// Resize and normalize `image` into a `(1, C, H, W)` tensor on `device`.
    pub fn to_tensor<B: Backend>(
        &self,
        image: &DynamicImage,
        device: &B::Device,
    ) -> Result<ImageTensor<B>> {
        let values = self.to_values(image)?;
        Ok(ImageTensor::from_chw(values, self.shape, device)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use neurocam_core::backend::NdArray;
    use std::io::Cursor;

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_normalization_presets() {
        let imagenet = Normalization::imagenet();
        assert!((imagenet.apply(0, 0.485)).abs() < 1e-6);
        let symmetric = Normalization::symmetric();
        assert_eq!(symmetric.apply(1, 0.0), -1.0);
        assert_eq!(symmetric.apply(2, 1.0), 1.0);
        assert_eq!(Normalization::default(), imagenet);
    }

    #[test]
    fn test_decode_png() {
        let image = RgbImage::from_pixel(12, 7, Rgb([10, 20, 30]));
        let decoded = Preprocessor::decode(&png_bytes(&image)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
    }

    #[test]
    fn test_decode_garbage() {
        let result = Preprocessor::decode(b"definitely not an image");
        assert!(matches!(result, Err(TransformError::Decode(_))));
    }

    #[test]
    fn test_values_are_channel_major() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 9, Rgb([255, 0, 255])));
        let pre = Preprocessor::new(ImageShape::new(3, 4, 4), Normalization::symmetric());
        let values = pre.to_values(&image).unwrap();

        assert_eq!(values.len(), 48);
        assert!(values[..16].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(values[16..32].iter().all(|&v| (v + 1.0).abs() < 1e-6));
        assert!(values[32..].iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_grayscale_input() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([255, 255, 255])));
        let pre = Preprocessor::new(ImageShape::new(1, 2, 2), Normalization::symmetric());
        let values = pre.to_values(&image).unwrap();
        assert_eq!(values, vec![1.0; 4]);
    }

    #[test]
    fn test_unsupported_channels() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let pre = Preprocessor::new(ImageShape::new(4, 2, 2), Normalization::default());
        assert!(matches!(
            pre.to_values(&image),
            Err(TransformError::UnsupportedChannels(4))
        ));
    }

    #[test]
    fn test_to_tensor_shape() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(30, 20));
        let pre = Preprocessor::new(ImageShape::new(3, 16, 16), Normalization::imagenet());
        let tensor = pre.to_tensor::<NdArray>(&image, &Default::default()).unwrap();
        assert_eq!(tensor.batch(), 1);
        assert_eq!(tensor.shape(), ImageShape::new(3, 16, 16));
    }
}
