//! Layer descriptions, roles and the named interface wrapping them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collection::Named;
use crate::converter::{DataConverter, PixelConverter, VectorConverter};
use crate::error::{IoError, Result};
use crate::image::ImageLayerDescription;
use crate::value::{BackingBuffer, Value};
use crate::vector::{ElementType, VectorLayerDescription};

/// The role a layer plays in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    /// Data written into the model.
    Input,
    /// Data read out of the model.
    Output,
    /// Declared layer without a trained model behind it, used to collect
    /// labeled data.
    Placeholder,
}

impl LayerRole {
    /// Returns `true` if values are written into layers of this role.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Input | Self::Placeholder)
    }

    /// Returns the role name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Description of one layer, by kind.
///
/// Each variant is converted by its own [`DataConverter`]; the methods here
/// dispatch to the right one.
#[derive(Debug, Clone)]
pub enum LayerDescription {
    /// A vector (array) layer.
    Vector(VectorLayerDescription),
    /// An image layer.
    Image(ImageLayerDescription),
}

impl LayerDescription {
    /// Returns the declared shape.
    #[must_use]
    pub fn shape(&self) -> &[i64] {
        match self {
            Self::Vector(d) => d.shape(),
            Self::Image(d) => d.shape(),
        }
    }

    /// Returns the number of elements in one item of this layer.
    #[must_use]
    pub const fn length(&self) -> usize {
        match self {
            Self::Vector(d) => d.length(),
            Self::Image(d) => d.length(),
        }
    }

    /// Returns `true` if values are carried in the `u8` domain.
    #[must_use]
    pub const fn is_quantized(&self) -> bool {
        match self {
            Self::Vector(d) => d.is_quantized(),
            Self::Image(d) => d.is_quantized(),
        }
    }

    /// Returns `true` if the layer has a leading batch dimension.
    #[must_use]
    pub const fn is_batched(&self) -> bool {
        match self {
            Self::Vector(d) => d.is_batched(),
            Self::Image(d) => d.is_batched(),
        }
    }

    /// Returns the element type of this layer's backing buffer.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        ElementType::for_quantized(self.is_quantized())
    }

    /// Returns the vector description, if this is a vector layer.
    #[must_use]
    pub const fn as_vector(&self) -> Option<&VectorLayerDescription> {
        match self {
            Self::Vector(d) => Some(d),
            Self::Image(_) => None,
        }
    }

    /// Returns the image description, if this is an image layer.
    #[must_use]
    pub const fn as_image(&self) -> Option<&ImageLayerDescription> {
        match self {
            Self::Image(d) => Some(d),
            Self::Vector(_) => None,
        }
    }

    /// Allocates a zeroed backing buffer for this layer.
    #[must_use]
    pub fn create_backing_buffer(&self) -> BackingBuffer {
        match self {
            Self::Vector(d) => VectorConverter.create_backing_buffer(d),
            Self::Image(d) => PixelConverter.create_backing_buffer(d),
        }
    }

    /// Writes `value` into a fresh backing buffer.
    ///
    /// # Errors
    ///
    /// See [`DataConverter::write_buffer`].
    pub fn to_buffer(&self, value: &Value) -> Result<BackingBuffer> {
        match self {
            Self::Vector(d) => VectorConverter.to_buffer(value, d),
            Self::Image(d) => PixelConverter.to_buffer(value, d),
        }
    }

    /// Writes `value` into a reused backing buffer.
    ///
    /// # Errors
    ///
    /// See [`DataConverter::write_buffer`].
    pub fn write_buffer(&self, value: &Value, buffer: &mut BackingBuffer) -> Result<()> {
        match self {
            Self::Vector(d) => VectorConverter.write_buffer(value, d, buffer),
            Self::Image(d) => PixelConverter.write_buffer(value, d, buffer),
        }
    }

    /// Reads a value out of a backing buffer.
    ///
    /// # Errors
    ///
    /// See [`DataConverter::from_buffer`].
    pub fn from_buffer(&self, buffer: &BackingBuffer) -> Result<Value> {
        match self {
            Self::Vector(d) => VectorConverter.from_buffer(buffer, d),
            Self::Image(d) => PixelConverter.from_buffer(buffer, d),
        }
    }
}

impl From<VectorLayerDescription> for LayerDescription {
    fn from(description: VectorLayerDescription) -> Self {
        Self::Vector(description)
    }
}

impl From<ImageLayerDescription> for LayerDescription {
    fn from(description: ImageLayerDescription) -> Self {
        Self::Image(description)
    }
}

/// A named layer of a model together with its role and description.
///
/// # Example
///
/// ```
/// use ml_io::{LayerInterface, LayerRole, VectorLayerDescription};
///
/// let description = VectorLayerDescription::new(vec![4], false, None, false, None, None).unwrap();
/// let layer = LayerInterface::new("features", LayerRole::Input, description).unwrap();
///
/// assert_eq!(layer.name(), "features");
/// assert_eq!(layer.description().length(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct LayerInterface {
    name: String,
    role: LayerRole,
    description: LayerDescription,
}

impl LayerInterface {
    /// Wraps a description.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingQuantizer`] if a quantized vector layer
    /// lacks the conversion function its role needs: a quantizer for inputs
    /// and placeholders, a dequantizer for outputs.
    pub fn new(
        name: impl Into<String>,
        role: LayerRole,
        description: impl Into<LayerDescription>,
    ) -> Result<Self> {
        let name = name.into();
        let description = description.into();

        if let LayerDescription::Vector(d) = &description {
            if d.is_quantized() {
                if role.is_written() && d.quantizer().is_none() {
                    return Err(IoError::missing_quantizer(format!(
                        "{role} layer '{name}' is quantized but has no quantizer"
                    )));
                }
                if !role.is_written() && d.dequantizer().is_none() {
                    return Err(IoError::missing_quantizer(format!(
                        "{role} layer '{name}' is quantized but has no dequantizer"
                    )));
                }
            }
        }

        Ok(Self {
            name,
            role,
            description,
        })
    }

    /// Returns the layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the layer role.
    #[must_use]
    pub const fn role(&self) -> LayerRole {
        self.role
    }

    /// Returns the layer description.
    #[must_use]
    pub const fn description(&self) -> &LayerDescription {
        &self.description
    }
}

impl Named for LayerInterface {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::image::PixelFormat;
    use crate::pixels::PixelBuffer;
    use crate::quantize::StandardScheme;

    fn quantized_vector(with_quantizer: bool, with_dequantizer: bool) -> VectorLayerDescription {
        let scheme = StandardScheme::ZeroToOne;
        VectorLayerDescription::new(
            vec![2],
            false,
            None,
            true,
            with_quantizer.then(|| scheme.quantizer()),
            with_dequantizer.then(|| scheme.dequantizer()),
        )
        .unwrap()
    }

    #[test]
    fn role_properties() {
        assert!(LayerRole::Input.is_written());
        assert!(LayerRole::Placeholder.is_written());
        assert!(!LayerRole::Output.is_written());
        assert_eq!(LayerRole::Placeholder.to_string(), "placeholder");
    }

    #[test]
    fn quantized_input_needs_quantizer() {
        let err = LayerInterface::new("in", LayerRole::Input, quantized_vector(false, true));
        assert!(matches!(err, Err(IoError::MissingQuantizer(_))));
        assert!(LayerInterface::new("in", LayerRole::Input, quantized_vector(true, false)).is_ok());
    }

    #[test]
    fn quantized_output_needs_dequantizer() {
        let err = LayerInterface::new("out", LayerRole::Output, quantized_vector(true, false));
        assert!(matches!(err, Err(IoError::MissingQuantizer(_))));
        assert!(LayerInterface::new("out", LayerRole::Output, quantized_vector(false, true)).is_ok());
    }

    #[test]
    fn description_dispatches_to_vector_converter() {
        let d: LayerDescription = VectorLayerDescription::new(vec![2], false, None, false, None, None)
            .unwrap()
            .into();
        let buffer = d.to_buffer(&Value::Vector(vec![1.0, 2.0])).unwrap();
        assert_eq!(d.element_type(), ElementType::Float32);
        assert_eq!(d.from_buffer(&buffer).unwrap(), Value::Vector(vec![1.0, 2.0]));
        assert!(d.as_vector().is_some());
        assert!(d.as_image().is_none());
    }

    #[test]
    fn description_dispatches_to_pixel_converter() {
        let d: LayerDescription =
            ImageLayerDescription::new(vec![1, 1, 3], false, PixelFormat::Rgb, true, None)
                .unwrap()
                .into();
        let mut buffer = d.create_backing_buffer();
        let pixels = PixelBuffer::new(1, 1, vec![1, 2, 3, 255]).unwrap();
        d.write_buffer(&Value::Pixels(pixels.clone()), &mut buffer).unwrap();
        assert_eq!(buffer.as_u8().unwrap(), &[1, 2, 3]);
        assert_eq!(d.from_buffer(&buffer).unwrap(), Value::Pixels(pixels));
        assert_eq!(d.length(), 3);
        assert!(d.is_quantized());
    }

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&LayerRole::Output).unwrap(), r#""output""#);
    }
}
