//! Description of an image layer.
//!
//! Image layers have shape `[height, width, 3]`, optionally preceded by a
//! batch dimension. Quantized layers carry raw `u8` channel values.
//! Unquantized layers carry `f32` values produced by a [`PixelNormalization`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IoError, Result};
use crate::quantize::StandardScheme;
use crate::shape;
use crate::vector::ElementType;

/// Number of color channels written to an image tensor.
pub const CHANNELS: usize = 3;

/// Channel order expected by the tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Red, green, blue.
    #[default]
    #[serde(rename = "RGB")]
    Rgb,
    /// Blue, green, red.
    #[serde(rename = "BGR")]
    Bgr,
}

impl PixelFormat {
    /// Maps each tensor channel to its index in an RGBA pixel.
    #[must_use]
    pub const fn channel_order(&self) -> [usize; CHANNELS] {
        match self {
            Self::Rgb => [0, 1, 2],
            Self::Bgr => [2, 1, 0],
        }
    }
}

/// Per-channel affine map between `u8` pixel values and tensor values.
///
/// `normalize(p, c) = p * scale[c] + bias[c]`, and `denormalize` is its
/// inverse, rounded and saturated to `u8`.
///
/// # Example
///
/// ```
/// use ml_io::PixelNormalization;
///
/// let norm = PixelNormalization::NEGATIVE_ONE_TO_ONE;
/// assert!((norm.normalize(0, 0) + 1.0).abs() < 1e-6);
/// assert!((norm.normalize(255, 0) - 1.0).abs() < 1e-6);
/// assert_eq!(norm.denormalize(1.0, 0), 255);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelNormalization {
    /// Per-channel multiplicative factor.
    pub scale: [f32; CHANNELS],

    /// Per-channel additive offset.
    pub bias: [f32; CHANNELS],
}

impl PixelNormalization {
    /// Maps `[0, 255]` onto `[0, 1]`.
    pub const ZERO_TO_ONE: Self = Self {
        scale: [1.0 / 255.0; CHANNELS],
        bias: [0.0; CHANNELS],
    };

    /// Maps `[0, 255]` onto `[-1, 1]`.
    pub const NEGATIVE_ONE_TO_ONE: Self = Self {
        scale: [2.0 / 255.0; CHANNELS],
        bias: [-1.0; CHANNELS],
    };

    /// Leaves channel values unchanged.
    pub const UNITY: Self = Self {
        scale: [1.0; CHANNELS],
        bias: [0.0; CHANNELS],
    };

    /// Creates a normalization with the same scale for every channel.
    #[must_use]
    pub const fn new(scale: f32, bias: [f32; CHANNELS]) -> Self {
        Self {
            scale: [scale; CHANNELS],
            bias,
        }
    }

    /// Builds `(p / 255 - mean) / std` per channel.
    #[must_use]
    pub fn from_mean_std(mean: [f32; CHANNELS], std: [f32; CHANNELS]) -> Self {
        Self {
            scale: std.map(|s| 1.0 / (255.0 * s)),
            bias: [
                -mean[0] / std[0],
                -mean[1] / std[1],
                -mean[2] / std[2],
            ],
        }
    }

    /// `ImageNet` mean and standard deviation normalization.
    #[must_use]
    pub fn imagenet() -> Self {
        Self::from_mean_std([0.485, 0.456, 0.406], [0.229, 0.224, 0.225])
    }

    /// Returns the normalization for a standard value range.
    #[must_use]
    pub const fn standard(scheme: StandardScheme) -> Self {
        match scheme {
            StandardScheme::ZeroToOne => Self::ZERO_TO_ONE,
            StandardScheme::NegativeOneToOne => Self::NEGATIVE_ONE_TO_ONE,
        }
    }

    /// Normalizes one channel value.
    #[must_use]
    pub fn normalize(&self, value: u8, channel: usize) -> f32 {
        f32::from(value).mul_add(self.scale[channel], self.bias[channel])
    }

    /// Maps one tensor value back to a channel value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn denormalize(&self, value: f32, channel: usize) -> u8 {
        ((value - self.bias[channel]) / self.scale[channel])
            .round()
            .clamp(0.0, 255.0) as u8
    }

    /// Returns `false` if any scale is zero or any parameter is not finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.scale.iter().all(|&s| s.is_finite() && s.abs() > 1e-10)
            && self.bias.iter().all(|b| b.is_finite())
    }
}

impl Default for PixelNormalization {
    fn default() -> Self {
        Self::ZERO_TO_ONE
    }
}

/// Declared normalization for an image layer.
///
/// Deserializes from `{"standard": "[0,1]"}` or
/// `{"scale": 0.0039, "bias": [0.0, 0.0, 0.0]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizationSpec {
    /// A standard value range.
    Standard {
        /// The range.
        standard: StandardScheme,
    },
    /// Explicit parameters shared by all channels except the bias.
    Affine {
        /// Multiplicative factor.
        scale: f32,
        /// Per-channel additive offset.
        bias: [f32; CHANNELS],
    },
}

impl NormalizationSpec {
    /// Resolves the declared parameters.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] if the parameters are degenerate.
    pub fn resolve(&self) -> Result<PixelNormalization> {
        let normalization = match *self {
            Self::Standard { standard } => PixelNormalization::standard(standard),
            Self::Affine { scale, bias } => PixelNormalization::new(scale, bias),
        };
        if !normalization.is_valid() {
            return Err(IoError::invalid_config(format!(
                "degenerate pixel normalization: {normalization:?}"
            )));
        }
        Ok(normalization)
    }
}

/// Immutable description of an image input or output layer.
///
/// # Example
///
/// ```
/// use ml_io::{ImageLayerDescription, PixelFormat, PixelNormalization};
///
/// let description = ImageLayerDescription::new(
///     vec![-1, 224, 224, 3],
///     true,
///     PixelFormat::Rgb,
///     false,
///     Some(PixelNormalization::ZERO_TO_ONE),
/// )
/// .unwrap();
///
/// assert_eq!((description.width(), description.height()), (224, 224));
/// assert_eq!(description.length(), 224 * 224 * 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayerDescription {
    shape: Vec<i64>,
    batched: bool,
    width: u32,
    height: u32,
    format: PixelFormat,
    quantized: bool,
    normalization: Option<PixelNormalization>,
}

impl ImageLayerDescription {
    /// Creates an image description.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidShape`] unless the shape is `[height, width, 3]`,
    ///   or `[batch, height, width, 3]` with a batch of 1 or unspecified on a
    ///   batched layer.
    /// - [`IoError::InvalidConfig`] if a normalization is supplied for a
    ///   quantized layer or is degenerate.
    pub fn new(
        shape: Vec<i64>,
        batched: bool,
        format: PixelFormat,
        quantized: bool,
        normalization: Option<PixelNormalization>,
    ) -> Result<Self> {
        let dims = shape::dims(&shape, batched)?;
        let item = match dims.as_slice() {
            [1, rest @ ..] if batched && rest.len() == CHANNELS => rest,
            all => all,
        };
        let &[height, width, channels] = item else {
            return Err(IoError::invalid_shape(
                &shape,
                "image layers must be [height, width, 3]",
            ));
        };
        if channels != CHANNELS {
            return Err(IoError::invalid_shape(
                &shape,
                format!("image layers need {CHANNELS} channels, got {channels}"),
            ));
        }
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(IoError::invalid_shape(&shape, "image dimensions exceed u32"));
        };
        shape::volume(&shape, batched)?;

        if let Some(normalization) = &normalization {
            if quantized {
                return Err(IoError::invalid_config(
                    "quantized image layers carry raw pixel values and take no normalization",
                ));
            }
            if !normalization.is_valid() {
                return Err(IoError::invalid_config(format!(
                    "degenerate pixel normalization: {normalization:?}"
                )));
            }
        }

        debug!(?shape, width, height, ?format, quantized, "image layer described");

        Ok(Self {
            shape,
            batched,
            width,
            height,
            format,
            quantized,
            normalization,
        })
    }

    /// Returns the declared shape.
    #[must_use]
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    /// Returns the image width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of elements in one image.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }

    /// Returns `true` if the layer has a leading batch dimension.
    #[must_use]
    pub const fn is_batched(&self) -> bool {
        self.batched
    }

    /// Returns the channel order.
    #[must_use]
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns `true` if channel values are carried as raw `u8`.
    #[must_use]
    pub const fn is_quantized(&self) -> bool {
        self.quantized
    }

    /// Returns the normalization, if any.
    #[must_use]
    pub const fn normalization(&self) -> Option<&PixelNormalization> {
        self.normalization.as_ref()
    }

    /// Returns the element type of this layer's backing buffer.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        ElementType::for_quantized(self.quantized)
    }
}
