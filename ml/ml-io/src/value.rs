//! Application-level values and the linear buffers tensor engines consume.

use ndarray::ArrayD;

use crate::classification::ClassificationMap;
use crate::error::{IoError, Result};
use crate::pixels::PixelBuffer;
use crate::vector::ElementType;

/// A value written to or read from a layer.
///
/// Converters match on this exhaustively; each converter documents which
/// kinds it accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Flat numeric values, already unrolled row-major.
    Vector(Vec<f32>),
    /// N-dimensional values, unrolled row-major on write.
    Array(ArrayD<f32>),
    /// Values already in the quantized `u8` domain.
    Bytes(Vec<u8>),
    /// Values keyed by the layer's labels.
    Labeled(ClassificationMap),
    /// An RGBA8 image.
    Pixels(PixelBuffer),
}

impl Value {
    /// Returns a short name for the value kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Array(_) => "array",
            Self::Bytes(_) => "bytes",
            Self::Labeled(_) => "labeled",
            Self::Pixels(_) => "pixels",
        }
    }

    /// Returns the flat values of a [`Value::Vector`].
    #[must_use]
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the map of a [`Value::Labeled`].
    #[must_use]
    pub const fn as_labeled(&self) -> Option<&ClassificationMap> {
        match self {
            Self::Labeled(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the image of a [`Value::Pixels`].
    #[must_use]
    pub const fn as_pixels(&self) -> Option<&PixelBuffer> {
        match self {
            Self::Pixels(p) => Some(p),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for Value {
    fn from(values: Vec<f32>) -> Self {
        Self::Vector(values)
    }
}

impl From<ArrayD<f32>> for Value {
    fn from(values: ArrayD<f32>) -> Self {
        Self::Array(values)
    }
}

impl From<Vec<u8>> for Value {
    fn from(values: Vec<u8>) -> Self {
        Self::Bytes(values)
    }
}

impl From<ClassificationMap> for Value {
    fn from(values: ClassificationMap) -> Self {
        Self::Labeled(values)
    }
}

impl From<PixelBuffer> for Value {
    fn from(pixels: PixelBuffer) -> Self {
        Self::Pixels(pixels)
    }
}

/// Linear element buffer backing one layer.
///
/// Elements are stored row-major. [`BackingBuffer::as_bytes`] exposes the
/// packed native-endian bytes an on-device engine reads.
///
/// # Example
///
/// ```
/// use ml_io::{BackingBuffer, ElementType};
///
/// let buffer = BackingBuffer::zeroed(ElementType::Float32, 4);
/// assert_eq!(buffer.len(), 4);
/// assert_eq!(buffer.as_bytes().len(), 16);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BackingBuffer {
    /// Unquantized elements.
    Float(Vec<f32>),
    /// Quantized elements.
    Quantized(Vec<u8>),
}

impl BackingBuffer {
    /// Allocates `len` zeroed elements of `element_type`.
    #[must_use]
    pub fn zeroed(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Float32 => Self::Float(vec![0.0; len]),
            ElementType::UInt8 => Self::Quantized(vec![0; len]),
        }
    }

    /// Copies packed native-endian bytes into a buffer of `element_type`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::IncompatibleBuffer`] if the byte count is not a
    /// multiple of the element size.
    pub fn from_bytes(element_type: ElementType, bytes: &[u8]) -> Result<Self> {
        let size = element_type.size_of();
        if bytes.len() % size != 0 {
            return Err(IoError::incompatible_buffer(format!(
                "{} bytes is not a whole number of {size}-byte elements",
                bytes.len()
            )));
        }
        Ok(match element_type {
            ElementType::Float32 => Self::Float(
                bytes
                    .chunks_exact(size)
                    .map(bytemuck::pod_read_unaligned::<f32>)
                    .collect(),
            ),
            ElementType::UInt8 => Self::Quantized(bytes.to_vec()),
        })
    }

    /// Returns the element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Float(_) => ElementType::Float32,
            Self::Quantized(_) => ElementType::UInt8,
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Quantized(v) => v.len(),
        }
    }

    /// Returns `true` if the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the packed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float(v) => bytemuck::cast_slice(v),
            Self::Quantized(v) => v,
        }
    }

    /// Returns the packed bytes for an engine to write into.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Float(v) => bytemuck::cast_slice_mut(v),
            Self::Quantized(v) => v,
        }
    }

    /// Returns the elements of a [`BackingBuffer::Float`].
    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(v),
            Self::Quantized(_) => None,
        }
    }

    /// Returns the elements of a [`BackingBuffer::Quantized`].
    #[must_use]
    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            Self::Quantized(v) => Some(v),
            Self::Float(_) => None,
        }
    }

    /// Checks that this buffer can back a layer of `element_type` and `len`.
    pub(crate) fn check_layout(&self, element_type: ElementType, len: usize) -> Result<()> {
        if self.element_type() != element_type {
            return Err(IoError::incompatible_buffer(format!(
                "expected {element_type:?} elements, buffer holds {:?}",
                self.element_type()
            )));
        }
        if self.len() != len {
            return Err(IoError::incompatible_buffer(format!(
                "expected {len} elements, buffer holds {}",
                self.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn value_kinds() {
        assert_eq!(Value::from(vec![1.0f32]).kind(), "vector");
        assert_eq!(Value::from(vec![1u8]).kind(), "bytes");
        assert_eq!(Value::from(ClassificationMap::new()).kind(), "labeled");
        assert_eq!(Value::from(ArrayD::<f32>::zeros(vec![2, 2])).kind(), "array");
    }

    #[test]
    fn value_accessors() {
        let v = Value::from(vec![1.0f32, 2.0]);
        assert_eq!(v.as_vector(), Some([1.0f32, 2.0].as_slice()));
        assert!(v.as_labeled().is_none());
        assert!(v.as_pixels().is_none());
    }

    #[test]
    fn zeroed_buffers() {
        let f = BackingBuffer::zeroed(ElementType::Float32, 3);
        assert_eq!(f.as_f32(), Some([0.0f32; 3].as_slice()));
        assert_eq!(f.as_bytes().len(), 12);

        let q = BackingBuffer::zeroed(ElementType::UInt8, 3);
        assert_eq!(q.as_u8(), Some([0u8; 3].as_slice()));
        assert_eq!(q.as_bytes().len(), 3);
    }

    #[test]
    fn bytes_are_native_endian_packed() {
        let buffer = BackingBuffer::Float(vec![1.0, -2.5]);
        let mut expected = 1.0f32.to_ne_bytes().to_vec();
        expected.extend_from_slice(&(-2.5f32).to_ne_bytes());
        assert_eq!(buffer.as_bytes(), expected.as_slice());
    }

    #[test]
    fn from_bytes_round_trip() {
        let buffer = BackingBuffer::Float(vec![0.25, 8.0, -1.0]);
        let restored = BackingBuffer::from_bytes(ElementType::Float32, buffer.as_bytes()).unwrap();
        assert_eq!(restored, buffer);
    }

    #[test]
    fn from_bytes_rejects_partial_elements() {
        let err = BackingBuffer::from_bytes(ElementType::Float32, &[0u8; 6]);
        assert!(matches!(err, Err(IoError::IncompatibleBuffer(_))));
    }

    #[test]
    fn engine_writes_through_bytes() {
        let mut buffer = BackingBuffer::zeroed(ElementType::Float32, 1);
        buffer.as_bytes_mut().copy_from_slice(&3.0f32.to_ne_bytes());
        assert_eq!(buffer.as_f32(), Some([3.0f32].as_slice()));
    }

    #[test]
    fn layout_check() {
        let buffer = BackingBuffer::zeroed(ElementType::UInt8, 4);
        assert!(buffer.check_layout(ElementType::UInt8, 4).is_ok());
        assert!(buffer.check_layout(ElementType::UInt8, 5).is_err());
        assert!(buffer.check_layout(ElementType::Float32, 4).is_err());
    }
}
