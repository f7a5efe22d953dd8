//! Conversion between application values and layer backing buffers.
//!
//! A converter never retains a buffer beyond a call. Writes go through an
//! exclusive borrow of the caller's [`BackingBuffer`], which is overwritten
//! from its first element, and every input check runs before the first
//! element is written.

use tracing::trace;

use crate::classification::ClassificationMap;
use crate::error::{IoError, Result};
use crate::image::{CHANNELS, ImageLayerDescription, PixelNormalization};
use crate::pixels::PixelBuffer;
use crate::value::{BackingBuffer, Value};
use crate::vector::VectorLayerDescription;

/// Translates between [`Value`]s and the buffer layout a tensor engine expects.
pub trait DataConverter {
    /// The layer description driving the conversion.
    type Description;

    /// Allocates a zeroed buffer sized for one item of the layer.
    fn create_backing_buffer(&self, description: &Self::Description) -> BackingBuffer;

    /// Writes `value` into `buffer`, which must have been created for this
    /// layer.
    ///
    /// # Errors
    ///
    /// - [`IoError::IncompatibleBuffer`] if `buffer` has the wrong element
    ///   type or length.
    /// - [`IoError::UnsupportedValueType`] if the value kind cannot be
    ///   written to this layer.
    /// - [`IoError::LengthMismatch`] if the value's element count differs
    ///   from the layer length.
    ///
    /// On error `buffer` is left untouched.
    fn write_buffer(
        &self,
        value: &Value,
        description: &Self::Description,
        buffer: &mut BackingBuffer,
    ) -> Result<()>;

    /// Writes `value` into a freshly created buffer.
    ///
    /// # Errors
    ///
    /// See [`DataConverter::write_buffer`].
    fn to_buffer(&self, value: &Value, description: &Self::Description) -> Result<BackingBuffer> {
        let mut buffer = self.create_backing_buffer(description);
        self.write_buffer(value, description, &mut buffer)?;
        Ok(buffer)
    }

    /// Reads one item of the layer out of `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::IncompatibleBuffer`] if `buffer` has the wrong
    /// element type or length.
    fn from_buffer(&self, buffer: &BackingBuffer, description: &Self::Description)
    -> Result<Value>;
}

/// Converter for vector layers.
///
/// Accepts [`Value::Vector`] and [`Value::Array`] on any layer,
/// [`Value::Labeled`] on labeled layers, and [`Value::Bytes`] on quantized
/// layers. Reads produce [`Value::Labeled`] for labeled layers and
/// [`Value::Vector`] otherwise. A quantized layer without a dequantizer reads
/// back as [`Value::Bytes`].
///
/// # Example
///
/// ```
/// use ml_io::{DataConverter, Value, VectorConverter, VectorLayerDescription};
/// use ndarray::arr2;
///
/// let description = VectorLayerDescription::new(vec![2, 4], false, None, false, None, None).unwrap();
/// let matrix = arr2(&[[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]).into_dyn();
///
/// let buffer = VectorConverter.to_buffer(&Value::Array(matrix), &description).unwrap();
/// assert_eq!(buffer.as_f32().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorConverter;

impl VectorConverter {
    fn write_floats<'a, I>(
        values: I,
        description: &VectorLayerDescription,
        buffer: &mut BackingBuffer,
    ) -> Result<()>
    where
        I: ExactSizeIterator<Item = &'a f32>,
    {
        check_length(description.length(), values.len())?;

        match buffer {
            BackingBuffer::Float(out) => {
                for (o, &v) in out.iter_mut().zip(values) {
                    *o = v;
                }
            }
            BackingBuffer::Quantized(out) => {
                let quantizer = description.quantizer().ok_or_else(|| {
                    IoError::missing_quantizer("float values written to a layer without a quantizer")
                })?;
                for (o, &v) in out.iter_mut().zip(values) {
                    *o = quantizer.quantize(v);
                }
            }
        }
        Ok(())
    }

    fn labeled_in_order(
        values: &ClassificationMap,
        description: &VectorLayerDescription,
    ) -> Result<Vec<f32>> {
        let labels = description
            .labels()
            .ok_or_else(|| IoError::unsupported_value("labeled value for an unlabeled layer"))?;
        check_length(description.length(), values.len())?;

        labels
            .iter()
            .map(|label| {
                values
                    .get(label)
                    .copied()
                    .ok_or_else(|| IoError::key_not_found(label.as_str()))
            })
            .collect()
    }
}

impl DataConverter for VectorConverter {
    type Description = VectorLayerDescription;

    fn create_backing_buffer(&self, description: &VectorLayerDescription) -> BackingBuffer {
        BackingBuffer::zeroed(description.element_type(), description.length())
    }

    fn write_buffer(
        &self,
        value: &Value,
        description: &VectorLayerDescription,
        buffer: &mut BackingBuffer,
    ) -> Result<()> {
        buffer.check_layout(description.element_type(), description.length())?;
        trace!(kind = value.kind(), length = description.length(), "writing vector layer");

        match value {
            Value::Vector(values) => Self::write_floats(values.iter(), description, buffer),
            Value::Array(values) => Self::write_floats(values.iter(), description, buffer),
            Value::Labeled(values) => {
                let ordered = Self::labeled_in_order(values, description)?;
                Self::write_floats(ordered.iter(), description, buffer)
            }
            Value::Bytes(bytes) => {
                let BackingBuffer::Quantized(out) = buffer else {
                    return Err(IoError::unsupported_value(
                        "bytes written to an unquantized layer",
                    ));
                };
                check_length(description.length(), bytes.len())?;
                out.copy_from_slice(bytes);
                Ok(())
            }
            Value::Pixels(_) => Err(IoError::unsupported_value(
                "pixels written to a vector layer",
            )),
        }
    }

    fn from_buffer(
        &self,
        buffer: &BackingBuffer,
        description: &VectorLayerDescription,
    ) -> Result<Value> {
        buffer.check_layout(description.element_type(), description.length())?;
        trace!(length = description.length(), "reading vector layer");

        let values = match buffer {
            BackingBuffer::Float(values) => values.clone(),
            BackingBuffer::Quantized(bytes) => match description.dequantizer() {
                Some(dequantizer) => bytes.iter().map(|&q| dequantizer.dequantize(q)).collect(),
                None => return Ok(Value::Bytes(bytes.clone())),
            },
        };

        Ok(match description.labeled_values(&values)? {
            Some(labeled) => Value::Labeled(labeled),
            None => Value::Vector(values),
        })
    }
}

/// Converter for image layers.
///
/// Accepts [`Value::Pixels`] whose dimensions match the layer and reads back
/// [`Value::Pixels`] with an opaque alpha channel. Alpha is not written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelConverter;

impl DataConverter for PixelConverter {
    type Description = ImageLayerDescription;

    fn create_backing_buffer(&self, description: &ImageLayerDescription) -> BackingBuffer {
        BackingBuffer::zeroed(description.element_type(), description.length())
    }

    fn write_buffer(
        &self,
        value: &Value,
        description: &ImageLayerDescription,
        buffer: &mut BackingBuffer,
    ) -> Result<()> {
        buffer.check_layout(description.element_type(), description.length())?;

        let Value::Pixels(pixels) = value else {
            return Err(IoError::unsupported_value(format!(
                "{} written to an image layer",
                value.kind()
            )));
        };
        if (pixels.width(), pixels.height()) != (description.width(), description.height()) {
            return Err(IoError::invalid_dimensions(pixels.width(), pixels.height()));
        }
        let expected = PixelBuffer::expected_buffer_size(pixels.width(), pixels.height());
        check_length(expected, pixels.as_rgba().len())?;
        trace!(
            width = pixels.width(),
            height = pixels.height(),
            "writing image layer"
        );

        let order = description.format().channel_order();
        match buffer {
            BackingBuffer::Quantized(out) => {
                for (o, px) in out.chunks_exact_mut(CHANNELS).zip(pixels.pixels()) {
                    for (c, &source) in order.iter().enumerate() {
                        o[c] = px[source];
                    }
                }
            }
            BackingBuffer::Float(out) => {
                let normalization = description
                    .normalization()
                    .copied()
                    .unwrap_or(PixelNormalization::UNITY);
                for (o, px) in out.chunks_exact_mut(CHANNELS).zip(pixels.pixels()) {
                    for (c, &source) in order.iter().enumerate() {
                        o[c] = normalization.normalize(px[source], source);
                    }
                }
            }
        }
        Ok(())
    }

    fn from_buffer(
        &self,
        buffer: &BackingBuffer,
        description: &ImageLayerDescription,
    ) -> Result<Value> {
        buffer.check_layout(description.element_type(), description.length())?;
        trace!(
            width = description.width(),
            height = description.height(),
            "reading image layer"
        );

        let order = description.format().channel_order();
        let mut rgba = vec![u8::MAX; PixelBuffer::expected_buffer_size(
            description.width(),
            description.height(),
        )];

        match buffer {
            BackingBuffer::Quantized(values) => {
                for (px, v) in rgba.chunks_exact_mut(4).zip(values.chunks_exact(CHANNELS)) {
                    for (c, &target) in order.iter().enumerate() {
                        px[target] = v[c];
                    }
                }
            }
            BackingBuffer::Float(values) => {
                let normalization = description
                    .normalization()
                    .copied()
                    .unwrap_or(PixelNormalization::UNITY);
                for (px, v) in rgba.chunks_exact_mut(4).zip(values.chunks_exact(CHANNELS)) {
                    for (c, &target) in order.iter().enumerate() {
                        px[target] = normalization.denormalize(v[c], target);
                    }
                }
            }
        }

        PixelBuffer::new(description.width(), description.height(), rgba).map(Value::Pixels)
    }
}

fn check_length(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(IoError::length_mismatch(expected, actual))
    }
}
