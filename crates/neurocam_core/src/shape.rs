//! Image and feature-map shape metadata.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Shape metadata for a single image or feature map.
///
/// Follows the convention `(C, H, W)`:
/// - `C`: Channels
/// - `H`: Height
/// - `W`: Width
///
/// # Example
///
/// ```rust
/// use neurocam_core::ImageShape;
///
/// let shape = ImageShape::new(3, 224, 224);
/// assert_eq!(shape.channels(), 3);
/// assert_eq!(shape.spatial(), 224 * 224);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    channels: usize,
    height: usize,
    width: usize,
}

impl ImageShape {
    /// Create a new shape with the specified dimensions.
    #[must_use]
    pub const fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Create an RGB shape of the given square resolution.
    #[must_use]
    pub const fn rgb(size: usize) -> Self {
        Self::new(3, size, size)
    }

    /// Create an ImageShape from a slice of dimensions.
    ///
    /// Accepts either `[C, H, W]` or a batch-of-one `[1, C, H, W]`.
    ///
    /// # Errors
    ///
    /// Returns an error for any other rank, or a batch dimension other than one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use neurocam_core::ImageShape;
    ///
    /// let shape = ImageShape::from_dims(&[1, 512, 7, 7]).unwrap();
    /// assert_eq!(shape.as_array(), [512, 7, 7]);
    /// ```
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        match *dims {
            [c, h, w] => Ok(Self::new(c, h, w)),
            [1, c, h, w] => Ok(Self::new(c, h, w)),
            [b, _, _, _] => Err(CoreError::InvalidShape {
                expected: "batch size 1".to_string(),
                got: format!("batch size {}", b),
            }),
            _ => Err(CoreError::DimensionError {
                expected: 3,
                got: dims.len(),
            }),
        }
    }

    /// Get the number of channels.
    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Get the height.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Get the width.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of spatial positions (`H * W`).
    #[must_use]
    pub const fn spatial(&self) -> usize {
        self.height * self.width
    }

    /// Get the total number of elements.
    #[must_use]
    pub const fn numel(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// Check if this is an empty shape (any dimension is zero).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.channels == 0 || self.height == 0 || self.width == 0
    }

    /// Convert to an array.
    #[must_use]
    pub const fn as_array(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    /// Dimensions of a batch of `batch` tensors of this shape.
    #[must_use]
    pub const fn batched(&self, batch: usize) -> [usize; 4] {
        [batch, self.channels, self.height, self.width]
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(C={}, H={}, W={})", self.channels, self.height, self.width)
    }
}

impl From<[usize; 3]> for ImageShape {
    fn from([channels, height, width]: [usize; 3]) -> Self {
        Self::new(channels, height, width)
    }
}
