//! Image tensor types and tensor read-back helpers.

use burn::prelude::*;

use crate::error::{CoreError, Result};
use crate::shape::ImageShape;

/// An image batch tensor wrapper with shape metadata.
///
/// Wraps a Burn tensor and ensures the shape follows the `(B, C, H, W)` convention.
///
/// # Example
///
/// ```rust,ignore
/// use neurocam_core::ImageTensor;
///
/// let tensor = Tensor::<NdArray, 4>::zeros([1, 3, 224, 224], &device);
/// let image = ImageTensor::new(tensor)?;
/// assert_eq!(image.batch(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ImageTensor<B: Backend> {
    inner: Tensor<B, 4>,
    batch: usize,
    shape: ImageShape,
}

impl<B: Backend> ImageTensor<B> {
    /// Create a new ImageTensor from a Burn tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension is zero.
    pub fn new(tensor: Tensor<B, 4>) -> Result<Self> {
        let [batch, channels, height, width] = tensor.dims();
        let shape = ImageShape::new(channels, height, width);
        if batch == 0 || shape.is_empty() {
            return Err(CoreError::InvalidShape {
                expected: "non-empty (B, C, H, W)".to_string(),
                got: format!("[{}, {}, {}, {}]", batch, channels, height, width),
            });
        }
        Ok(Self {
            inner: tensor,
            batch,
            shape,
        })
    }

    /// Build a single-image tensor from channel-major `(C, H, W)` values.
    ///
    /// # Errors
    ///
    /// Returns an error if `values.len()` does not match the shape.
    pub fn from_chw(values: Vec<f32>, shape: ImageShape, device: &B::Device) -> Result<Self> {
        if values.len() != shape.numel() {
            return Err(CoreError::InvalidShape {
                expected: format!("{} values for {}", shape.numel(), shape),
                got: format!("{} values", values.len()),
            });
        }
        let data = TensorData::new(values, shape.batched(1));
        Self::new(Tensor::from_data(data, device))
    }

    /// Get the batch size.
    #[must_use]
    pub const fn batch(&self) -> usize {
        self.batch
    }

    /// Get the per-image shape.
    #[must_use]
    pub const fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Get a reference to the underlying Burn tensor.
    #[must_use]
    pub const fn inner(&self) -> &Tensor<B, 4> {
        &self.inner
    }

    /// Consume self and return the underlying Burn tensor.
    #[must_use]
    pub fn into_inner(self) -> Tensor<B, 4> {
        self.inner
    }

    /// Clone the tensor to a new device.
    pub fn to_device(&self, device: &B::Device) -> Self {
        Self {
            inner: self.inner.clone().to_device(device),
            batch: self.batch,
            shape: self.shape,
        }
    }
}

/// Read a tensor back into a flat `Vec<f32>` in row-major order.
///
/// # Errors
///
/// Returns [`CoreError::TensorData`] if the backend data cannot be converted.
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| CoreError::TensorData(format!("{:?}", e)))
}

/// Index of the largest value; the first index wins on ties.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_image_tensor_from_chw() {
        let device = Default::default();
        let shape = ImageShape::new(3, 2, 2);
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let image = ImageTensor::<TestBackend>::from_chw(values.clone(), shape, &device).unwrap();

        assert_eq!(image.batch(), 1);
        assert_eq!(image.shape(), shape);
        assert_eq!(image.inner().dims(), [1, 3, 2, 2]);
        assert_eq!(tensor_to_vec(image.into_inner()).unwrap(), values);
    }

    #[test]
    fn test_image_tensor_rejects_wrong_length() {
        let device = Default::default();
        let result =
            ImageTensor::<TestBackend>::from_chw(vec![0.0; 5], ImageShape::new(3, 2, 2), &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_image_tensor_rejects_empty() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::zeros([1, 0, 2, 2], &device);
        assert!(ImageTensor::new(tensor).is_err());
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_first_wins_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), Some(0));
    }
}
