//! Saliency map computation.

use burn::prelude::*;
use ndarray::Array2;
use neurocam_core::{tensor_to_vec, CoreError};
use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, Result};

/// Epsilon of the Grad-CAM++ alpha denominator and of the final normalization.
pub const DEFAULT_EPSILON: f32 = 1e-7;

/// Method for computing saliency maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributionMethod {
    /// Gradient-weighted Class Activation Mapping (mean-pooled gradients).
    GradCam,
    /// Grad-CAM++ (alpha-weighted positive gradients).
    #[default]
    GradCamPlusPlus,
}

/// Normalized saliency surface over the target layer's spatial grid.
///
/// Values lie in `[0, 1]`; the map is detached from any gradient tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    /// The saliency values, `(H, W)`.
    values: Array2<f32>,
    /// The method used.
    method: AttributionMethod,
    /// Class the map explains.
    target_class: usize,
}

impl SaliencyMap {
    /// Create a new saliency map.
    pub fn new(values: Array2<f32>, method: AttributionMethod, target_class: usize) -> Self {
        Self {
            values,
            method,
            target_class,
        }
    }

    /// Read a normalized `(H, W)` tensor into a map.
    pub fn from_tensor<B: Backend>(
        values: Tensor<B, 2>,
        method: AttributionMethod,
        target_class: usize,
    ) -> Result<Self> {
        let [height, width] = values.dims();
        let data = tensor_to_vec(values)?;
        let values = Array2::from_shape_vec((height, width), data)
            .map_err(|e| CoreError::TensorData(e.to_string()))?;
        Ok(Self::new(values, method, target_class))
    }

    /// The saliency values.
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Consume the map and return its values.
    pub fn into_values(self) -> Array2<f32> {
        self.values
    }

    /// Height of the map.
    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    /// Width of the map.
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// The method used.
    pub fn method(&self) -> AttributionMethod {
        self.method
    }

    /// Class the map explains.
    pub fn target_class(&self) -> usize {
        self.target_class
    }

    /// Largest value in the map.
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// A map with no spatial discrimination (all zeros).
    pub fn is_degenerate(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

fn check_shapes<B: Backend>(activations: &Tensor<B, 3>, gradients: &Tensor<B, 3>) -> Result<()> {
    let (a, g) = (activations.dims(), gradients.dims());
    if a != g {
        return Err(ExplainError::ShapeMismatch {
            activations: a,
            gradients: g,
        });
    }
    Ok(())
}

/// Grad-CAM++ alpha coefficients.
///
/// `alpha = G² / (2·G² + Σ_hw(A·G³) + eps)`, with the spatial sum taken per
/// channel and broadcast back over `(H, W)`.
///
/// # Arguments
///
/// * `activations` - Target layer activations `A` (channels, height, width)
/// * `gradients` - Gradients `G` of the class logit w.r.t. `A`, same shape
pub fn grad_cam_pp_alpha<B: Backend>(
    activations: Tensor<B, 3>,
    gradients: Tensor<B, 3>,
    epsilon: f32,
) -> Tensor<B, 3> {
    let grads_2 = gradients.clone() * gradients.clone();
    let grads_3 = grads_2.clone() * gradients;

    // (C, H, W) -> (C, 1, 1)
    let spatial_sum = (activations * grads_3).sum_dim(2).sum_dim(1);

    let numerator = grads_2.clone();
    let denominator = grads_2 * 2.0 + spatial_sum;
    numerator / (denominator + epsilon)
}

/// Grad-CAM++ channel weights: `w[c] = Σ_hw alpha[c] · relu(G[c])`.
///
/// Returns a tensor of shape (channels).
pub fn grad_cam_pp_weights<B: Backend>(
    activations: Tensor<B, 3>,
    gradients: Tensor<B, 3>,
    epsilon: f32,
) -> Tensor<B, 1> {
    let [channels, _, _] = gradients.dims();
    let alpha = grad_cam_pp_alpha(activations, gradients.clone(), epsilon);
    (alpha * gradients.clamp_min(0.0))
        .sum_dim(2)
        .sum_dim(1)
        .reshape([channels])
}

/// Grad-CAM channel weights: spatial mean of the gradients.
///
/// Returns a tensor of shape (channels).
pub fn grad_cam_weights<B: Backend>(gradients: Tensor<B, 3>) -> Tensor<B, 1> {
    let [channels, _, _] = gradients.dims();
    gradients.mean_dim(2).mean_dim(1).reshape([channels])
}

/// Rectified weighted sum over channels: `relu(Σ_c w[c] · A[c])`.
///
/// Returns a tensor of shape (height, width).
pub fn weighted_activation_sum<B: Backend>(
    activations: Tensor<B, 3>,
    weights: Tensor<B, 1>,
) -> Tensor<B, 2> {
    let [channels, height, width] = activations.dims();
    let weighted = activations * weights.reshape([channels, 1, 1]);
    weighted
        .sum_dim(0)
        .reshape([height, width])
        .clamp_min(0.0)
}

/// Shift to a zero minimum, then divide by `max + eps`.
///
/// A constant map becomes all zeros.
pub fn normalize_unit_interval<B: Backend>(cam: Tensor<B, 2>, epsilon: f32) -> Tensor<B, 2> {
    let min: f32 = cam.clone().min().into_scalar().elem();
    let shifted = cam.sub_scalar(min);
    let max: f32 = shifted.clone().max().into_scalar().elem();
    shifted.div_scalar(max + epsilon)
}

/// Compute a Grad-CAM++ saliency map.
///
/// # Arguments
///
/// * `activations` - Activations of the target layer (channels, height, width)
/// * `gradients` - Gradients w.r.t. those activations (channels, height, width)
/// * `target_class` - Class the gradients were taken for
/// * `epsilon` - Stabilizer, [`DEFAULT_EPSILON`] for reference parity
pub fn grad_cam_pp<B: Backend>(
    activations: Tensor<B, 3>,
    gradients: Tensor<B, 3>,
    target_class: usize,
    epsilon: f32,
) -> Result<SaliencyMap> {
    check_shapes(&activations, &gradients)?;
    let weights = grad_cam_pp_weights(activations.clone(), gradients, epsilon);
    let cam = weighted_activation_sum(activations, weights);
    SaliencyMap::from_tensor(
        normalize_unit_interval(cam, epsilon),
        AttributionMethod::GradCamPlusPlus,
        target_class,
    )
}

/// Compute a Grad-CAM saliency map.
///
/// Same inputs as [`grad_cam_pp`]; channel weights are the mean-pooled gradients.
pub fn grad_cam<B: Backend>(
    activations: Tensor<B, 3>,
    gradients: Tensor<B, 3>,
    target_class: usize,
    epsilon: f32,
) -> Result<SaliencyMap> {
    check_shapes(&activations, &gradients)?;
    let weights = grad_cam_weights(gradients);
    let cam = weighted_activation_sum(activations, weights);
    SaliencyMap::from_tensor(
        normalize_unit_interval(cam, epsilon),
        AttributionMethod::GradCam,
        target_class,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocam_core::backend::NdArray;

    type TestBackend = NdArray;

    fn tensor3(values: &[f32], dims: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::<TestBackend, 1>::from_floats(values, &Default::default()).reshape(dims)
    }

    fn assert_close(got: &[f32], expected: &[f32], tol: f32) {
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected.iter()) {
            assert!((g - e).abs() < tol, "got {:?}, expected {:?}", got, expected);
        }
    }

    // Channel 0: A = [1, 2, 3, 4], G = [1, -1, 2, 0]
    // Channel 1: A = [0, 1, 1, 0], G = [0.5, 0.5, 1, -2]
    const ACTS: [f32; 8] = [1.0, 2.0, 3.0, 4.0, 0.0, 1.0, 1.0, 0.0];
    const GRADS: [f32; 8] = [1.0, -1.0, 2.0, 0.0, 0.5, 0.5, 1.0, -2.0];

    #[test]
    fn test_attribution_method_default() {
        assert_eq!(AttributionMethod::default(), AttributionMethod::GradCamPlusPlus);
    }

    #[test]
    fn test_grad_cam_pp_alpha_hand_computed() {
        let alpha = grad_cam_pp_alpha(
            tensor3(&ACTS, [2, 2, 2]),
            tensor3(&GRADS, [2, 2, 2]),
            DEFAULT_EPSILON,
        );
        // sum(A·G³): channel 0 = 1 - 2 + 24 + 0 = 23, channel 1 = 0.125 + 1 = 1.125
        let expected = [
            1.0 / 25.0,
            1.0 / 25.0,
            4.0 / 31.0,
            0.0,
            0.25 / 1.625,
            0.25 / 1.625,
            1.0 / 3.125,
            4.0 / 9.125,
        ];
        assert_close(&tensor_to_vec(alpha).unwrap(), &expected, 1e-6);
    }

    #[test]
    fn test_grad_cam_pp_weights_hand_computed() {
        let weights = grad_cam_pp_weights(
            tensor3(&ACTS, [2, 2, 2]),
            tensor3(&GRADS, [2, 2, 2]),
            DEFAULT_EPSILON,
        );
        let w0 = 1.0 / 25.0 + 2.0 * 4.0 / 31.0;
        let w1 = 0.5 * 0.25 / 1.625 * 2.0 + 1.0 / 3.125;
        assert_close(&tensor_to_vec(weights).unwrap(), &[w0, w1], 1e-6);
    }

    #[test]
    fn test_grad_cam_pp_map_hand_computed() {
        let map = grad_cam_pp(
            tensor3(&ACTS, [2, 2, 2]),
            tensor3(&GRADS, [2, 2, 2]),
            3,
            DEFAULT_EPSILON,
        )
        .unwrap();

        let w0 = 1.0f32 / 25.0 + 2.0 * 4.0 / 31.0;
        let w1 = 0.5f32 * 0.25 / 1.625 * 2.0 + 1.0 / 3.125;
        let cam = [w0, 2.0 * w0 + w1, 3.0 * w0 + w1, 4.0 * w0];
        let min = cam[0];
        let max = cam[2] - min;
        let expected: Vec<f32> = cam.iter().map(|v| (v - min) / (max + DEFAULT_EPSILON)).collect();

        assert_eq!((map.height(), map.width()), (2, 2));
        assert_eq!(map.target_class(), 3);
        assert_eq!(map.method(), AttributionMethod::GradCamPlusPlus);
        let got: Vec<f32> = map.values().iter().copied().collect();
        assert_close(&got, &expected, 1e-5);
        assert!((map.max() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_grad_cam_hand_computed() {
        let map = grad_cam(
            tensor3(&ACTS, [2, 2, 2]),
            tensor3(&GRADS, [2, 2, 2]),
            0,
            DEFAULT_EPSILON,
        )
        .unwrap();
        // weights: mean(G) = [0.5, 0.0]
        // cam = 0.5 * A0 = [0.5, 1.0, 1.5, 2.0]
        let expected = [0.0, 0.5 / 1.5, 1.0 / 1.5, 1.0];
        let got: Vec<f32> = map.values().iter().copied().collect();
        assert_close(&got, &expected, 1e-5);
    }

    #[test]
    fn test_negative_cam_is_rectified() {
        let weights = Tensor::<TestBackend, 1>::from_floats([-1.0, 1.0], &Default::default());
        let cam = weighted_activation_sum(tensor3(&ACTS, [2, 2, 2]), weights);
        // -A0 + A1 = [-1, -1, -2, -4] -> all clipped
        assert_eq!(tensor_to_vec(cam).unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_constant_map_normalizes_to_zero() {
        let acts = [2.0f32; 8];
        let grads = [1.0f32; 8];
        let map = grad_cam_pp(
            tensor3(&acts, [2, 2, 2]),
            tensor3(&grads, [2, 2, 2]),
            0,
            DEFAULT_EPSILON,
        )
        .unwrap();
        assert!(map.is_degenerate());
    }

    #[test]
    fn test_zero_gradients_give_degenerate_map() {
        let map = grad_cam_pp(
            tensor3(&ACTS, [2, 2, 2]),
            tensor3(&[0.0; 8], [2, 2, 2]),
            0,
            DEFAULT_EPSILON,
        )
        .unwrap();
        assert!(map.is_degenerate());
        assert!(map.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_values_in_unit_interval() {
        let acts: Vec<f32> = (0..48).map(|i| ((i * 7) % 11) as f32 / 3.0).collect();
        let grads: Vec<f32> = (0..48).map(|i| ((i * 5) % 9) as f32 / 4.0 - 1.0).collect();
        let map = grad_cam_pp(
            tensor3(&acts, [3, 4, 4]),
            tensor3(&grads, [3, 4, 4]),
            0,
            DEFAULT_EPSILON,
        )
        .unwrap();
        assert!(map.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(map.is_degenerate() || (map.max() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shape_mismatch() {
        let result = grad_cam_pp(
            tensor3(&ACTS, [2, 2, 2]),
            tensor3(&ACTS, [2, 4, 1]),
            0,
            DEFAULT_EPSILON,
        );
        assert!(matches!(result, Err(ExplainError::ShapeMismatch { .. })));
    }
}
