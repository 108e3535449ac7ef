//! Mode-aware batch normalization.

use burn::nn::BatchNorm;
use burn::prelude::*;
use neurocam_core::Mode;

/// Apply 2D batch normalization in the given mode.
///
/// In [`Mode::Eval`] the running statistics are applied as a per-channel
/// affine transform, whether or not the backend records gradients. In
/// [`Mode::Train`] the module's own forward pass is used.
pub fn batch_norm_2d<B: Backend>(bn: &BatchNorm<B, 2>, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
    match mode {
        Mode::Train => bn.forward(x),
        Mode::Eval => {
            let gamma = bn.gamma.val();
            let [channels] = gamma.dims();
            let std = bn.running_var.value().add_scalar(bn.epsilon).sqrt();
            let scale = gamma / std;
            let shift = bn.beta.val() - bn.running_mean.value() * scale.clone();

            x * scale.reshape([1, channels, 1, 1]) + shift.reshape([1, channels, 1, 1])
        }
    }
}
