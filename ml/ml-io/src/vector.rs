//! Description of a vector (array) layer.
//!
//! Vector layers are always unrolled: from the tensor's point of view they
//! are a flat run of elements whose count is the layer volume. A layer of
//! shape `(24, 24, 2)` has length `24 * 24 * 2 = 1152`.
//!
//! Tensor engines expect row-major ordering, so the last dimension varies
//! fastest. The 2x4 matrix
//!
//! ```text
//! [[1 2 3 4]
//!  [5 6 7 8]]
//! ```
//!
//! is provided to the model as `[1 2 3 4 5 6 7 8]`.
//!
//! The length of a description counts elements, not bytes. A quantized layer
//! of length 4 occupies 4 bytes, an unquantized one 16.

use hashbrown::HashSet;
use tracing::debug;

use crate::classification::ClassificationMap;
use crate::error::{IoError, Result};
use crate::quantize::{Dequantizer, Quantizer};
use crate::shape;

/// Element type of a layer's backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Native 32-bit float.
    Float32,
    /// Quantized unsigned byte.
    UInt8,
}

impl ElementType {
    /// Returns the element type implied by a quantization flag.
    #[must_use]
    pub const fn for_quantized(quantized: bool) -> Self {
        if quantized { Self::UInt8 } else { Self::Float32 }
    }

    /// Size of one element in bytes.
    #[must_use]
    pub const fn size_of(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::UInt8 => 1,
        }
    }
}

/// Immutable description of a vector input, output or placeholder layer.
///
/// # Example
///
/// ```
/// use ml_io::VectorLayerDescription;
///
/// let labels = vec!["cat".to_string(), "dog".to_string()];
/// let description =
///     VectorLayerDescription::new(vec![2], false, Some(labels), false, None, None).unwrap();
///
/// assert_eq!(description.length(), 2);
/// assert!(description.is_labeled());
///
/// let labeled = description.labeled_values(&[0.25, 0.75]).unwrap().unwrap();
/// assert_eq!(labeled["dog"], 0.75);
/// ```
#[derive(Debug, Clone)]
pub struct VectorLayerDescription {
    shape: Vec<i64>,
    length: usize,
    batched: bool,
    labels: Option<Vec<String>>,
    quantized: bool,
    quantizer: Option<Quantizer>,
    dequantizer: Option<Dequantizer>,
}

impl VectorLayerDescription {
    /// Creates a vector description from the properties declared for a layer.
    ///
    /// An empty label list is treated as no labels.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidShape`] if the shape is empty, has a zero or
    ///   disallowed negative dimension, or its volume overflows.
    /// - [`IoError::InconsistentLabels`] if labels are present and their count
    ///   differs from the volume.
    /// - [`IoError::DuplicateLabel`] if a label appears more than once.
    /// - [`IoError::MissingQuantizer`] if `quantized` is set and neither
    ///   conversion function is supplied.
    /// - [`IoError::UnexpectedQuantizer`] if a conversion function is supplied
    ///   for an unquantized layer.
    pub fn new(
        shape: Vec<i64>,
        batched: bool,
        labels: Option<Vec<String>>,
        quantized: bool,
        quantizer: Option<Quantizer>,
        dequantizer: Option<Dequantizer>,
    ) -> Result<Self> {
        let length = shape::volume(&shape, batched)?;

        let labels = labels.filter(|l| !l.is_empty());
        if let Some(labels) = &labels {
            if labels.len() != length {
                return Err(IoError::inconsistent_labels(length, labels.len()));
            }
            let mut seen = HashSet::with_capacity(labels.len());
            if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
                return Err(IoError::duplicate_label(dup.as_str()));
            }
        }

        if quantized && quantizer.is_none() && dequantizer.is_none() {
            return Err(IoError::missing_quantizer(
                "quantized vector layer needs a quantizer or dequantizer",
            ));
        }
        if !quantized && quantizer.is_some() {
            return Err(IoError::unexpected_quantizer("quantizer"));
        }
        if !quantized && dequantizer.is_some() {
            return Err(IoError::unexpected_quantizer("dequantizer"));
        }

        debug!(?shape, length, quantized, labeled = labels.is_some(), "vector layer described");

        Ok(Self {
            shape,
            length,
            batched,
            labels,
            quantized,
            quantizer,
            dequantizer,
        })
    }

    /// Returns the declared shape.
    #[must_use]
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    /// Returns the number of elements in one item of this layer.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Returns `true` if the layer has a leading batch dimension.
    #[must_use]
    pub const fn is_batched(&self) -> bool {
        self.batched
    }

    /// Returns the labels, if any.
    #[must_use]
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Returns `true` if the layer has labels.
    #[must_use]
    pub const fn is_labeled(&self) -> bool {
        self.labels.is_some()
    }

    /// Returns `true` if values are carried in the `u8` domain.
    #[must_use]
    pub const fn is_quantized(&self) -> bool {
        self.quantized
    }

    /// Returns the quantizer, if any.
    #[must_use]
    pub const fn quantizer(&self) -> Option<&Quantizer> {
        self.quantizer.as_ref()
    }

    /// Returns the dequantizer, if any.
    #[must_use]
    pub const fn dequantizer(&self) -> Option<&Dequantizer> {
        self.dequantizer.as_ref()
    }

    /// Returns the element type of this layer's backing buffer.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        ElementType::for_quantized(self.quantized)
    }

    /// Returns the byte size of this layer's backing buffer.
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.length * self.element_type().size_of()
    }

    /// Pairs each label with the value at its position.
    ///
    /// Returns `Ok(None)` if the layer has no labels.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::LengthMismatch`] if `values` does not hold exactly
    /// `length` elements.
    pub fn labeled_values(&self, values: &[f32]) -> Result<Option<ClassificationMap>> {
        let Some(labels) = &self.labels else {
            return Ok(None);
        };

        if values.len() != self.length {
            return Err(IoError::length_mismatch(self.length, values.len()));
        }

        Ok(Some(
            labels
                .iter()
                .cloned()
                .zip(values.iter().copied())
                .collect(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("label_{i}")).collect()
    }

    #[test]
    fn length_is_volume() {
        let d = VectorLayerDescription::new(vec![2, 4], false, None, false, None, None).unwrap();
        assert_eq!(d.length(), 8);
        assert_eq!(d.shape(), &[2, 4]);
        assert_eq!(d.element_type(), ElementType::Float32);
        assert_eq!(d.byte_len(), 32);
    }

    #[test]
    fn batched_layer_accepts_unspecified_batch() {
        let d = VectorLayerDescription::new(vec![-1, 10], true, None, false, None, None).unwrap();
        assert_eq!(d.length(), 10);
        assert!(d.is_batched());
    }

    #[test]
    fn invalid_shapes_rejected() {
        for shape in [vec![], vec![0], vec![3, -1]] {
            let err = VectorLayerDescription::new(shape, false, None, false, None, None);
            assert!(matches!(err, Err(IoError::InvalidShape { .. })));
        }
    }

    #[test]
    fn labels_must_match_length() {
        let err = VectorLayerDescription::new(vec![3], false, Some(labels(2)), false, None, None);
        assert_eq!(err.unwrap_err(), IoError::inconsistent_labels(3, 2));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let labels = vec!["a".to_string(), "a".to_string()];
        let err = VectorLayerDescription::new(vec![2], false, Some(labels), false, None, None);
        assert_eq!(err.unwrap_err(), IoError::duplicate_label("a"));

        let labels = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let err = VectorLayerDescription::new(vec![3], false, Some(labels), false, None, None);
        assert!(matches!(err, Err(IoError::DuplicateLabel(_))));
    }

    #[test]
    fn labeled_values_has_one_entry_per_element() {
        let d = VectorLayerDescription::new(vec![2, 2], false, Some(labels(4)), false, None, None)
            .unwrap();
        let map = d.labeled_values(&[0.1, 0.2, 0.3, 0.4]).unwrap().unwrap();
        assert_eq!(map.len(), d.length());
    }

    #[test]
    fn empty_labels_mean_unlabeled() {
        let d = VectorLayerDescription::new(vec![3], false, Some(vec![]), false, None, None)
            .unwrap();
        assert!(!d.is_labeled());
        assert!(d.labels().is_none());
    }

    #[test]
    fn quantized_layer_needs_a_function() {
        let err = VectorLayerDescription::new(vec![4], false, None, true, None, None);
        assert!(matches!(err, Err(IoError::MissingQuantizer(_))));

        let d = VectorLayerDescription::new(
            vec![4],
            false,
            None,
            true,
            Some(Quantizer::affine(255.0, 0.0)),
            None,
        )
        .unwrap();
        assert_eq!(d.element_type(), ElementType::UInt8);
        assert_eq!(d.byte_len(), 4);
    }

    #[test]
    fn unquantized_layer_rejects_functions() {
        let err = VectorLayerDescription::new(
            vec![4],
            false,
            None,
            false,
            None,
            Some(Dequantizer::affine(1.0, 0.0)),
        );
        assert!(matches!(err, Err(IoError::UnexpectedQuantizer(_))));
    }

    #[test]
    fn labeled_values_pairs_positionally() {
        let d = VectorLayerDescription::new(vec![3], false, Some(labels(3)), false, None, None)
            .unwrap();
        let map = d.labeled_values(&[0.1, 0.2, 0.7]).unwrap().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["label_0"], 0.1);
        assert_eq!(map["label_2"], 0.7);
    }

    #[test]
    fn labeled_values_without_labels_is_none() {
        let d = VectorLayerDescription::new(vec![3], false, None, false, None, None).unwrap();
        assert!(d.labeled_values(&[0.1, 0.2, 0.7]).unwrap().is_none());
    }

    #[test]
    fn labeled_values_checks_length() {
        let d = VectorLayerDescription::new(vec![3], false, Some(labels(3)), false, None, None)
            .unwrap();
        assert_eq!(
            d.labeled_values(&[0.1]).unwrap_err(),
            IoError::length_mismatch(3, 1)
        );
    }
}
