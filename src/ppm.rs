//! Binary PPM (`P6`) decoding and encoding.
//!
//! Header: magic `P6`, then width, height, and max color value as ASCII
//! decimals separated by whitespace or `#` comments, then exactly one
//! whitespace byte before the raster of `r g b` triples.


use crate::buffer::{PixelBuffer, RGB_CHANNELS};
use crate::error::{DecodeError, GlitchError, PreconditionViolation};
use crate::limits::{ResourceLimits, estimate_memory};

/// Parsed `P6` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PpmHeader {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Maximum channel value, `1..=255`.
    pub max_value: u8,
    /// Offset of the first raster byte.
    pub data_offset: usize,
}

impl PpmHeader {
    /// Raster bytes required by the declared dimensions.
    pub fn raster_len(&self) -> Result<usize, DecodeError> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(RGB_CHANNELS))
            .ok_or(DecodeError::InvalidHeader("dimensions overflow"))
    }
}

/// A decoded PPM image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PpmImage {
    /// Maximum channel value from the header; written back on encode.
    pub max_value: u8,
    /// Decoded pixels, alpha set to 255.
    pub pixels: PixelBuffer,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.data.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn number(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(&b) = self.data.get(self.pos)
            && b.is_ascii_digit()
        {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(b - b'0')))
                .ok_or(DecodeError::InvalidHeader(what))?;
            self.pos += 1;
        }
        if self.pos == start {
            return Err(DecodeError::InvalidHeader(what));
        }
        Ok(value)
    }
}

/// Parse the header at the start of `data`.
pub fn parse_header(data: &[u8]) -> Result<PpmHeader, DecodeError> {
    if data.len() < 2 || &data[..2] != b"P6" {
        return Err(DecodeError::InvalidHeader("missing P6 magic"));
    }
    let mut cursor = Cursor { data, pos: 2 };
    match data.get(2) {
        Some(b) if b.is_ascii_whitespace() || *b == b'#' => {}
        _ => return Err(DecodeError::InvalidHeader("missing P6 magic")),
    }
    let width = cursor.number("bad width")?;
    let height = cursor.number("bad height")?;
    let max_value = cursor.number("bad max color value")?;
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidHeader("zero dimension"));
    }
    if max_value == 0 || max_value > 255 {
        return Err(DecodeError::UnsupportedMaxValue(max_value));
    }
    match data.get(cursor.pos) {
        Some(b) if b.is_ascii_whitespace() => {}
        _ => return Err(DecodeError::InvalidHeader("missing separator before raster")),
    }
    Ok(PpmHeader {
        width,
        height,
        max_value: max_value as u8,
        data_offset: cursor.pos + 1,
    })
}

/// Decode a `P6` image.
///
/// Limits are checked against the header before the raster is read; the
/// memory estimate covers the decoded buffer only. Bytes after the raster
/// are ignored.
pub fn decode(data: &[u8], limits: &ResourceLimits) -> Result<PpmImage, GlitchError> {
    limits.check_file_size(data.len() as u64)?;
    let header = parse_header(data)?;
    let (width, height) = (u64::from(header.width), u64::from(header.height));
    limits.check_dimensions(width, height)?;
    limits.check_memory(estimate_memory(width, height, 0))?;

    let expected = header.raster_len()?;
    let raster = &data[header.data_offset..];
    if raster.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: raster.len(),
        }
        .into());
    }
    if raster.len() > expected {
        tracing::debug!(trailing = raster.len() - expected, "ignoring bytes after raster");
    }
    let pixels = PixelBuffer::from_rgb_bytes(
        &raster[..expected],
        header.width as usize,
        header.height as usize,
    )?;
    tracing::debug!(
        width = header.width,
        height = header.height,
        max_value = header.max_value,
        "decoded ppm"
    );
    Ok(PpmImage {
        max_value: header.max_value,
        pixels,
    })
}

/// Encode `pixels` as `P6`, dropping alpha.
pub fn encode(pixels: &PixelBuffer, max_value: u8) -> Result<Vec<u8>, GlitchError> {
    if max_value == 0 {
        return Err(DecodeError::UnsupportedMaxValue(0).into());
    }
    if pixels.width() > u32::MAX as usize || pixels.height() > u32::MAX as usize {
        return Err(PreconditionViolation::InvalidDimensions {
            width: pixels.width(),
            height: pixels.height(),
        }
        .into());
    }
    let header = format!("P6\n{} {}\n{}\n", pixels.width(), pixels.height(), max_value);
    let mut out = Vec::with_capacity(header.len() + pixels.len() * RGB_CHANNELS);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&pixels.to_rgb_bytes());
    Ok(out)
}

impl PpmImage {
    /// Encode back to `P6` with the original max color value.
    pub fn encode(&self) -> Result<Vec<u8>, GlitchError> {
        encode(&self.pixels, self.max_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{LimitExceeded, Resource};
    use crate::pixel::opaque;

    fn sample(width: u32, height: u32) -> Vec<u8> {
        let mut data = format!("P6\n{width} {height}\n255\n").into_bytes();
        data.extend((0..width * height * 3).map(|i| i as u8));
        data
    }

    #[test]
    fn parses_plain_header() {
        let header = parse_header(b"P6\n640 480\n255\n").unwrap();
        assert_eq!(
            header,
            PpmHeader {
                width: 640,
                height: 480,
                max_value: 255,
                data_offset: 15
            }
        );
    }

    #[test]
    fn parses_comments_and_mixed_whitespace() {
        let header = parse_header(b"P6 # made by hand\n 3\t2 # size\n100\n").unwrap();
        assert_eq!((header.width, header.height, header.max_value), (3, 2, 100));
    }

    #[test]
    fn rejects_bad_headers() {
        assert_eq!(
            parse_header(b"P3\n1 1\n255\n"),
            Err(DecodeError::InvalidHeader("missing P6 magic"))
        );
        assert_eq!(
            parse_header(b"P6\nx 1\n255\n"),
            Err(DecodeError::InvalidHeader("bad width"))
        );
        assert_eq!(
            parse_header(b"P6\n0 1\n255\n"),
            Err(DecodeError::InvalidHeader("zero dimension"))
        );
        assert_eq!(
            parse_header(b"P6\n1 1\n65535\n"),
            Err(DecodeError::UnsupportedMaxValue(65535))
        );
        assert_eq!(
            parse_header(b"P6\n1 1\n255"),
            Err(DecodeError::InvalidHeader("missing separator before raster"))
        );
        assert!(parse_header(b"P6\n99999999999 1\n255\n").is_err());
    }

    #[test]
    fn decode_encode_preserves_bytes() {
        let data = sample(3, 2);
        let image = decode(&data, &ResourceLimits::none()).unwrap();
        assert_eq!(image.pixels.width(), 3);
        assert_eq!(image.pixels.get(1, 0), Some(opaque(3, 4, 5)));
        assert_eq!(image.encode().unwrap(), data);
    }

    #[test]
    fn truncated_raster_reports_counts() {
        let mut data = sample(2, 2);
        data.truncate(data.len() - 5);
        assert_eq!(
            decode(&data, &ResourceLimits::none()).unwrap_err(),
            GlitchError::Decode(DecodeError::Truncated {
                expected: 12,
                actual: 7
            })
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut data = sample(2, 1);
        data.extend_from_slice(b"extra");
        let image = decode(&data, &ResourceLimits::none()).unwrap();
        assert_eq!(image.pixels.len(), 2);
    }

    #[test]
    fn limits_reject_before_raster() {
        let data = b"P6\n5000 5000\n255\n";
        let limits = ResourceLimits::none().with_max_pixels(1_000_000);
        assert!(matches!(
            decode(data, &limits),
            Err(GlitchError::Limit(LimitExceeded {
                resource: Resource::Pixels,
                ..
            }))
        ));
        let limits = ResourceLimits::none().with_max_file_size(4);
        assert!(matches!(
            decode(data, &limits),
            Err(GlitchError::Limit(LimitExceeded {
                resource: Resource::FileSize,
                ..
            }))
        ));
    }

    #[test]
    fn largest_header_dimensions_do_not_overflow() {
        let data = b"P6\n4294967295 4294967295\n255\n";
        let header = parse_header(data).unwrap();
        assert_eq!(
            header.raster_len(),
            Err(DecodeError::InvalidHeader("dimensions overflow"))
        );
        assert_eq!(
            decode(data, &ResourceLimits::none()).unwrap_err(),
            GlitchError::Decode(DecodeError::InvalidHeader("dimensions overflow"))
        );
        let limits = ResourceLimits::none().with_max_memory(1 << 30);
        assert_eq!(
            decode(data, &limits).unwrap_err(),
            GlitchError::Limit(LimitExceeded {
                resource: Resource::Memory,
                actual: u64::MAX,
                max: 1 << 30,
            })
        );
    }

    #[test]
    fn max_value_roundtrips() {
        let mut data = b"P6\n1 1\n15\n".to_vec();
        data.extend_from_slice(&[1, 2, 3]);
        let image = decode(&data, &ResourceLimits::none()).unwrap();
        assert_eq!(image.max_value, 15);
        assert_eq!(image.encode().unwrap(), data);
    }
}
