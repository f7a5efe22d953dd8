//! Volume computation for declared layer shapes.
//!
//! A negative dimension is accepted only as the leading dimension of a
//! batched layer, where it stands for an unspecified batch size. Buffers hold
//! a single batch item, so that dimension contributes 1 to the volume.

use crate::error::{IoError, Result};

/// Returns the per-item dimensions of `shape` as unsigned sizes.
///
/// The leading dimension of a batched layer is replaced by 1 when negative.
pub(crate) fn dims(shape: &[i64], batched: bool) -> Result<Vec<usize>> {
    if shape.is_empty() {
        return Err(IoError::invalid_shape(shape, "shape is empty"));
    }

    shape
        .iter()
        .enumerate()
        .map(|(i, &dim)| match dim {
            0 => Err(IoError::invalid_shape(shape, format!("dimension {i} is zero"))),
            d if d < 0 && i == 0 && batched => Ok(1),
            d if d < 0 => Err(IoError::invalid_shape(
                shape,
                format!("dimension {i} is negative"),
            )),
            d => usize::try_from(d)
                .map_err(|_| IoError::invalid_shape(shape, format!("dimension {i} is too large"))),
        })
        .collect()
}

/// Returns the element count of one item of a layer with this shape.
pub(crate) fn volume(shape: &[i64], batched: bool) -> Result<usize> {
    dims(shape, batched)?
        .into_iter()
        .try_fold(1usize, usize::checked_mul)
        .ok_or_else(|| IoError::invalid_shape(shape, "volume overflows"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_product_of_dimensions() {
        assert_eq!(volume(&[2, 4], false).unwrap(), 8);
        assert_eq!(volume(&[24, 24, 2], false).unwrap(), 1152);
        assert_eq!(volume(&[1], false).unwrap(), 1);
    }

    #[test]
    fn leading_negative_dimension_is_unspecified_batch() {
        assert_eq!(volume(&[-1, 224, 224, 3], true).unwrap(), 224 * 224 * 3);
        assert_eq!(dims(&[-1, 4], true).unwrap(), vec![1, 4]);
    }

    #[test]
    fn negative_dimension_rejected_elsewhere() {
        assert!(matches!(
            volume(&[-1, 4], false),
            Err(IoError::InvalidShape { .. })
        ));
        assert!(matches!(
            volume(&[4, -2], true),
            Err(IoError::InvalidShape { .. })
        ));
    }

    #[test]
    fn empty_and_zero_shapes_rejected() {
        assert!(matches!(volume(&[], false), Err(IoError::InvalidShape { .. })));
        assert!(matches!(
            volume(&[3, 0], false),
            Err(IoError::InvalidShape { .. })
        ));
    }

    #[test]
    fn overflowing_volume_rejected() {
        let err = volume(&[i64::MAX, i64::MAX], false).unwrap_err();
        assert!(err.to_string().contains("overflow") || err.to_string().contains("too large"));
    }
}
