//! RGBA8 pixel buffers exchanged with image layers.

use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

/// An RGBA8 image, rows top to bottom, pixels left to right.
///
/// # Example
///
/// ```
/// use ml_io::PixelBuffer;
///
/// let pixels = PixelBuffer::new(2, 2, vec![0u8; 2 * 2 * 4]).unwrap();
/// assert_eq!(pixels.pixel_count(), 4);
/// assert_eq!(pixels.rgba(1, 0), Some([0, 0, 0, 0]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a pixel buffer from raw RGBA8 data.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidDimensions`] if either dimension is zero.
    /// - [`IoError::LengthMismatch`] if `rgba` is not `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(IoError::invalid_dimensions(width, height));
        }
        let expected = Self::expected_buffer_size(width, height);
        if rgba.len() != expected {
            return Err(IoError::length_mismatch(expected, rgba.len()));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Creates an opaque black image.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidDimensions`] if either dimension is zero.
    pub fn black(width: u32, height: u32) -> Result<Self> {
        let mut rgba = vec![0u8; Self::expected_buffer_size(width, height)];
        rgba.chunks_exact_mut(4).for_each(|px| px[3] = u8::MAX);
        Self::new(width, height, rgba)
    }

    /// Returns the byte size of an RGBA8 image with these dimensions.
    #[must_use]
    pub const fn expected_buffer_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
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

    /// Returns the total number of pixels.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns the raw RGBA8 bytes.
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Consumes the buffer, returning the raw RGBA8 bytes.
    #[must_use]
    pub fn into_rgba(self) -> Vec<u8> {
        self.rgba
    }

    /// Returns the pixel at `(x, y)`, or `None` outside the image.
    #[must_use]
    pub fn rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba
            .get(offset..offset + 4)
            .and_then(|px| px.try_into().ok())
    }

    /// Iterates over pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.rgba.chunks_exact(4)
    }
}
