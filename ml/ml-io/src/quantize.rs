//! Quantization functions between `f32` values and the `u8` domain.
//!
//! Converters never inline a quantization formula. They always call through a
//! [`Quantizer`] or [`Dequantizer`] handle, so any scheme can be supplied by
//! the code that builds a layer description. The affine constructors and
//! [`StandardScheme`] cover the schemes model bundles usually declare.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

type QuantizeFn = dyn Fn(f32) -> u8 + Send + Sync;
type DequantizeFn = dyn Fn(u8) -> f32 + Send + Sync;

/// Converts unquantized `f32` values into the `u8` domain.
///
/// # Example
///
/// ```
/// use ml_io::Quantizer;
///
/// let quantizer = Quantizer::affine(255.0, 0.0);
/// assert_eq!(quantizer.quantize(0.0), 0);
/// assert_eq!(quantizer.quantize(1.0), 255);
/// ```
#[derive(Clone)]
pub struct Quantizer(Arc<QuantizeFn>);

impl Quantizer {
    /// Wraps an arbitrary quantization function.
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(f32) -> u8 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Affine quantization: `q = round((x + bias) * scale)`, saturated to `[0, 255]`.
    #[must_use]
    pub fn affine(scale: f32, bias: f32) -> Self {
        Self::new(move |x| saturate_u8((x + bias) * scale))
    }

    /// Quantizes a single value.
    #[must_use]
    pub fn quantize(&self, value: f32) -> u8 {
        (self.0)(value)
    }
}

impl fmt::Debug for Quantizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Quantizer(..)")
    }
}

/// Converts `u8` values back into unquantized `f32` values.
///
/// # Example
///
/// ```
/// use ml_io::Dequantizer;
///
/// let dequantizer = Dequantizer::affine(1.0 / 255.0, 0.0);
/// assert!((dequantizer.dequantize(255) - 1.0).abs() < 1e-6);
/// ```
#[derive(Clone)]
pub struct Dequantizer(Arc<DequantizeFn>);

impl Dequantizer {
    /// Wraps an arbitrary dequantization function.
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u8) -> f32 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Affine dequantization: `x = q * scale + bias`.
    #[must_use]
    pub fn affine(scale: f32, bias: f32) -> Self {
        Self::new(move |q| f32::from(q).mul_add(scale, bias))
    }

    /// Dequantizes a single value.
    #[must_use]
    pub fn dequantize(&self, value: u8) -> f32 {
        (self.0)(value)
    }
}

impl fmt::Debug for Dequantizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dequantizer(..)")
    }
}

// NaN maps to 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn saturate_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Built-in quantization schemes, named by the value range they cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardScheme {
    /// Values in `[0, 1]` map onto `[0, 255]`.
    #[serde(rename = "[0,1]")]
    ZeroToOne,
    /// Values in `[-1, 1]` map onto `[0, 255]`.
    #[serde(rename = "[-1,1]")]
    NegativeOneToOne,
}

impl StandardScheme {
    /// Returns the `(scale, bias)` pair used for quantization.
    #[must_use]
    pub const fn quantize_params(&self) -> (f32, f32) {
        match self {
            Self::ZeroToOne => (255.0, 0.0),
            Self::NegativeOneToOne => (127.5, 1.0),
        }
    }

    /// Returns the `(scale, bias)` pair used for dequantization.
    #[must_use]
    pub const fn dequantize_params(&self) -> (f32, f32) {
        match self {
            Self::ZeroToOne => (1.0 / 255.0, 0.0),
            Self::NegativeOneToOne => (2.0 / 255.0, -1.0),
        }
    }

    /// Returns the quantizer for this scheme.
    #[must_use]
    pub fn quantizer(&self) -> Quantizer {
        let (scale, bias) = self.quantize_params();
        Quantizer::affine(scale, bias)
    }

    /// Returns the dequantizer for this scheme.
    #[must_use]
    pub fn dequantizer(&self) -> Dequantizer {
        let (scale, bias) = self.dequantize_params();
        Dequantizer::affine(scale, bias)
    }

    /// Returns the scheme name as written in model metadata.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ZeroToOne => "[0,1]",
            Self::NegativeOneToOne => "[-1,1]",
        }
    }
}

impl fmt::Display for StandardScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared quantization parameters for one direction of one layer.
///
/// Deserializes from either `{"standard": "[0,1]"}` or
/// `{"scale": 255.0, "bias": 0.0}`.
///
/// # Example
///
/// ```
/// use ml_io::{QuantizationSpec, StandardScheme};
///
/// let spec: QuantizationSpec = serde_json::from_str(r#"{"standard": "[-1,1]"}"#).unwrap();
/// assert_eq!(spec, QuantizationSpec::Standard { standard: StandardScheme::NegativeOneToOne });
/// assert_eq!(spec.quantizer().unwrap().quantize(1.0), 255);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuantizationSpec {
    /// A named built-in scheme.
    Standard {
        /// The scheme.
        standard: StandardScheme,
    },
    /// Explicit affine parameters.
    Affine {
        /// Multiplicative factor.
        scale: f32,
        /// Additive offset.
        bias: f32,
    },
}

impl QuantizationSpec {
    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] if an affine scale is zero or any
    /// parameter is not finite.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Standard { .. } => Ok(()),
            Self::Affine { scale, bias } => {
                if !scale.is_finite() || scale == 0.0 {
                    return Err(IoError::invalid_config(format!(
                        "quantization scale must be finite and non-zero, got {scale}"
                    )));
                }
                if !bias.is_finite() {
                    return Err(IoError::invalid_config(format!(
                        "quantization bias must be finite, got {bias}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Resolves these parameters into a quantizer.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] if the parameters are invalid.
    pub fn quantizer(&self) -> Result<Quantizer> {
        self.validate()?;
        Ok(match *self {
            Self::Standard { standard } => standard.quantizer(),
            Self::Affine { scale, bias } => Quantizer::affine(scale, bias),
        })
    }

    /// Resolves these parameters into a dequantizer.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] if the parameters are invalid.
    pub fn dequantizer(&self) -> Result<Dequantizer> {
        self.validate()?;
        Ok(match *self {
            Self::Standard { standard } => standard.dequantizer(),
            Self::Affine { scale, bias } => Dequantizer::affine(scale, bias),
        })
    }
}

impl From<StandardScheme> for QuantizationSpec {
    fn from(standard: StandardScheme) -> Self {
        Self::Standard { standard }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn affine_quantizer_rounds_and_saturates() {
        let q = Quantizer::affine(255.0, 0.0);
        assert_eq!(q.quantize(0.0), 0);
        assert_eq!(q.quantize(0.5), 128);
        assert_eq!(q.quantize(1.0), 255);
        assert_eq!(q.quantize(2.0), 255);
        assert_eq!(q.quantize(-1.0), 0);
        assert_eq!(q.quantize(f32::NAN), 0);
    }

    #[test]
    fn custom_functions_are_called_through() {
        let q = Quantizer::new(|x| if x > 0.0 { 1 } else { 0 });
        let d = Dequantizer::new(|q| f32::from(q) * 10.0);
        assert_eq!(q.quantize(0.3), 1);
        assert_eq!(d.dequantize(3), 30.0);
    }

    #[test]
    fn zero_to_one_round_trip_within_half_step() {
        let scheme = StandardScheme::ZeroToOne;
        let (q, d) = (scheme.quantizer(), scheme.dequantizer());
        for i in 0..=100u8 {
            let x = f32::from(i) / 100.0;
            assert_abs_diff_eq!(d.dequantize(q.quantize(x)), x, epsilon = 0.5 / 255.0 + 1e-6);
        }
    }

    #[test]
    fn negative_one_to_one_round_trip_within_half_step() {
        let scheme = StandardScheme::NegativeOneToOne;
        let (q, d) = (scheme.quantizer(), scheme.dequantizer());
        assert_eq!(q.quantize(-1.0), 0);
        assert_eq!(q.quantize(1.0), 255);
        assert_abs_diff_eq!(d.dequantize(0), -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d.dequantize(255), 1.0, epsilon = 1e-6);
        for i in 0..=100u8 {
            let x = f32::from(i) / 50.0 - 1.0;
            assert_abs_diff_eq!(d.dequantize(q.quantize(x)), x, epsilon = 1.0 / 255.0 + 1e-6);
        }
    }

    #[test]
    fn scheme_display() {
        assert_eq!(StandardScheme::ZeroToOne.to_string(), "[0,1]");
        assert_eq!(StandardScheme::NegativeOneToOne.to_string(), "[-1,1]");
    }

    #[test]
    fn parameters_deserialize_standard_and_affine() {
        let standard: QuantizationSpec = serde_json::from_str(r#"{"standard":"[0,1]"}"#).unwrap();
        assert_eq!(standard, StandardScheme::ZeroToOne.into());

        let affine: QuantizationSpec =
            serde_json::from_str(r#"{"scale":0.5,"bias":-2.0}"#).unwrap();
        assert_eq!(affine, QuantizationSpec::Affine { scale: 0.5, bias: -2.0 });
        assert_eq!(affine.dequantizer().unwrap().dequantize(10), 3.0);
    }

    #[test]
    fn parameters_reject_unknown_scheme() {
        let parsed = serde_json::from_str::<QuantizationSpec>(r#"{"standard":"[0,2]"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn parameters_reject_degenerate_affine() {
        let zero = QuantizationSpec::Affine { scale: 0.0, bias: 0.0 };
        assert!(matches!(zero.quantizer(), Err(IoError::InvalidConfig(_))));

        let nan = QuantizationSpec::Affine { scale: 1.0, bias: f32::NAN };
        assert!(matches!(nan.dequantizer(), Err(IoError::InvalidConfig(_))));
    }
}
