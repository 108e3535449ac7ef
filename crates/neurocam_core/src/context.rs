//! Execution context: device placement and network mode.

use std::fmt;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Network mode.
///
/// Layers whose behavior differs between training and inference (batch
/// normalization) read the mode from the [`ExecutionContext`] instead of from
/// hidden state on the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Training mode: batch statistics are computed from the input.
    Train,
    /// Evaluation mode: running statistics are used.
    Eval,
}

impl Mode {
    /// Check if this is evaluation mode.
    #[must_use]
    pub const fn is_eval(&self) -> bool {
        matches!(self, Mode::Eval)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => write!(f, "train"),
            Mode::Eval => write!(f, "eval"),
        }
    }
}

/// Process-wide execution settings passed explicitly into every operation.
///
/// Holds the device all tensors of a computation live on and the [`Mode`] the
/// network runs in.
///
/// # Example
///
/// ```rust
/// use burn_autodiff::Autodiff;
/// use neurocam_core::backend::NdArray;
/// use neurocam_core::{ExecutionContext, Mode};
///
/// let ctx = ExecutionContext::<Autodiff<NdArray>>::inference(Default::default());
/// assert_eq!(ctx.mode(), Mode::Eval);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext<B: Backend> {
    device: B::Device,
    mode: Mode,
}

impl<B: Backend> ExecutionContext<B> {
    /// Create a context with an explicit mode.
    pub fn new(device: B::Device, mode: Mode) -> Self {
        Self { device, mode }
    }

    /// Create an evaluation-mode context for inference.
    pub fn inference(device: B::Device) -> Self {
        Self::new(device, Mode::Eval)
    }

    /// Create a training-mode context.
    pub fn training(device: B::Device) -> Self {
        Self::new(device, Mode::Train)
    }

    /// The device tensors are placed on.
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// The network mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Return a copy of this context in another mode.
    #[must_use]
    pub fn with_mode(&self, mode: Mode) -> Self {
        Self {
            device: self.device.clone(),
            mode,
        }
    }

    /// Fail unless the context is in evaluation mode.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ModeViolation`] for a training-mode context.
    pub fn ensure_eval(&self) -> Result<()> {
        if self.mode.is_eval() {
            Ok(())
        } else {
            Err(CoreError::ModeViolation {
                required: Mode::Eval,
                actual: self.mode,
            })
        }
    }
}

impl<B: Backend> Default for ExecutionContext<B> {
    fn default() -> Self {
        Self::inference(B::Device::default())
    }
}
