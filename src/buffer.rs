//! Owned pixel grid.
//!
//! [`PixelBuffer`] wraps a dense, row-major [`ImgVec`] of [`Pixel`]s. Its
//! dimensions are fixed at construction and its length is always
//! `width * height`. Pixel contents are only rewritten by the reorder engine.

use std::fmt;

use imgref::{ImgRef, ImgVec};

use crate::error::{DecodeError, GlitchError, PreconditionViolation};
use crate::pixel::{Pixel, opaque};

/// Bytes per pixel in the RGB wire layout.
pub const RGB_CHANNELS: usize = 3;

/// Bytes per pixel in the RGBA wire layout.
pub const RGBA_CHANNELS: usize = 4;

/// A `width × height` grid of [`Pixel`]s.
#[derive(Clone)]
pub struct PixelBuffer {
    img: ImgVec<Pixel>,
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.same_dimensions(other) && self.pixels() == other.pixels()
    }
}

impl Eq for PixelBuffer {}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

fn pixel_count(width: usize, height: usize) -> Result<usize, PreconditionViolation> {
    match width.checked_mul(height) {
        Some(n) if n > 0 => Ok(n),
        _ => Err(PreconditionViolation::InvalidDimensions { width, height }),
    }
}

fn expected_bytes(width: usize, height: usize, channels: usize) -> Result<usize, GlitchError> {
    let count = pixel_count(width, height)?;
    count
        .checked_mul(channels)
        .ok_or(GlitchError::Precondition(PreconditionViolation::InvalidDimensions {
            width,
            height,
        }))
}

fn check_byte_len(expected: usize, actual: usize) -> Result<(), DecodeError> {
    if actual < expected {
        return Err(DecodeError::Truncated { expected, actual });
    }
    if actual > expected {
        return Err(DecodeError::ExcessData { expected, actual });
    }
    Ok(())
}

impl PixelBuffer {
    /// Buffer filled with `fill`.
    pub fn new(width: usize, height: usize, fill: Pixel) -> Result<Self, PreconditionViolation> {
        let count = pixel_count(width, height)?;
        Ok(Self {
            img: ImgVec::new(vec![fill; count], width, height),
        })
    }

    /// Take ownership of row-major `pixels`.
    pub fn from_pixels(
        pixels: Vec<Pixel>,
        width: usize,
        height: usize,
    ) -> Result<Self, PreconditionViolation> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(PreconditionViolation::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            img: ImgVec::new(pixels, width, height),
        })
    }

    /// Decode packed `r g b` triples. Alpha is set to 255.
    ///
    /// `bytes` must hold exactly `width * height * 3` bytes.
    pub fn from_rgb_bytes(bytes: &[u8], width: usize, height: usize) -> Result<Self, GlitchError> {
        let expected = expected_bytes(width, height, RGB_CHANNELS)?;
        check_byte_len(expected, bytes.len())?;
        let pixels = bytes
            .chunks_exact(RGB_CHANNELS)
            .map(|c| opaque(c[0], c[1], c[2]))
            .collect();
        Ok(Self {
            img: ImgVec::new(pixels, width, height),
        })
    }

    /// Decode packed `r g b a` quads. Alpha passes through unchanged.
    ///
    /// `bytes` must hold exactly `width * height * 4` bytes.
    pub fn from_rgba_bytes(bytes: &[u8], width: usize, height: usize) -> Result<Self, GlitchError> {
        let expected = expected_bytes(width, height, RGBA_CHANNELS)?;
        check_byte_len(expected, bytes.len())?;
        let pixels = bytes
            .chunks_exact(RGBA_CHANNELS)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect();
        Ok(Self {
            img: ImgVec::new(pixels, width, height),
        })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// `width * height`.
    #[inline]
    pub fn len(&self) -> usize {
        self.img.buf().len()
    }

    /// Never true: zero-sized buffers cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.img.buf().is_empty()
    }

    /// Row-major index of `(x, y)`, if inside the grid.
    #[inline]
    pub fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width() && y < self.height()).then(|| y * self.width() + x)
    }

    /// Pixel at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<Pixel> {
        self.index_of(x, y).map(|i| self.img.buf()[i])
    }

    /// Pixel at row-major `index`.
    pub fn get_linear(&self, index: usize) -> Option<Pixel> {
        self.img.buf().get(index).copied()
    }

    /// All pixels, row-major.
    #[inline]
    pub fn pixels(&self) -> &[Pixel] {
        self.img.buf()
    }

    #[inline]
    pub(crate) fn pixels_mut(&mut self) -> &mut [Pixel] {
        self.img.buf_mut()
    }

    /// Borrow as an [`ImgRef`].
    pub fn as_img(&self) -> ImgRef<'_, Pixel> {
        self.img.as_ref()
    }

    /// Consume into the underlying [`ImgVec`].
    pub fn into_img(self) -> ImgVec<Pixel> {
        self.img
    }

    /// Whether `other` has the same width and height.
    pub fn same_dimensions(&self, other: &Self) -> bool {
        self.width() == other.width() && self.height() == other.height()
    }

    /// Packed `r g b` triples; alpha is dropped.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * RGB_CHANNELS);
        for p in self.pixels() {
            out.extend_from_slice(&[p.r, p.g, p.b]);
        }
        out
    }

    /// Packed `r g b a` quads.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * RGBA_CHANNELS);
        for p in self.pixels() {
            out.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        out
    }
}

impl TryFrom<ImgVec<Pixel>> for PixelBuffer {
    type Error = PreconditionViolation;

    /// Accepts any [`ImgVec`], compacting padded strides.
    fn try_from(img: ImgVec<Pixel>) -> Result<Self, Self::Error> {
        let (buf, width, height) = img.as_ref().to_contiguous_buf();
        Self::from_pixels(buf.into_owned(), width, height)
    }
}
