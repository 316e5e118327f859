//! Pixel type and scalar sort keys.
//!
//! Pixels are [`rgb::Rgba<u8>`]. Alpha travels with the pixel through every
//! reorder but never contributes to a key.

use std::fmt;

use rgb::Rgba;

/// One pixel: red, green, blue, alpha.
pub type Pixel = Rgba<u8>;

/// Opaque pixel from color channels (alpha = 255).
#[inline]
pub const fn opaque(r: u8, g: u8, b: u8) -> Pixel {
    Rgba { r, g, b, a: 255 }
}

/// Rec. 709 weighted luminance in `0..=255`.
pub fn luminance(p: &Pixel) -> u16 {
    (0.2126 * p.r as f32 + 0.7152 * p.g as f32 + 0.0722 * p.b as f32) as u16
}

/// Hue angle in degrees, `0..360`. Grays map to 0.
pub fn hue(p: &Pixel) -> u16 {
    let (r, g, b) = (p.r as f32, p.g as f32, p.b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta == 0.0 {
        return 0;
    }
    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    ((60.0 * sector) as u16).min(359)
}

/// HSV saturation scaled to `0..=255`.
pub fn saturation(p: &Pixel) -> u16 {
    let max = p.r.max(p.g).max(p.b) as u16;
    if max == 0 {
        return 0;
    }
    let min = p.r.min(p.g).min(p.b) as u16;
    255 * (max - min) / max
}

/// Scalar a segment is sorted by.
#[derive(Clone, Copy, Default)]
#[non_exhaustive]
pub enum SortKey {
    /// [`luminance`].
    #[default]
    Luminance,
    /// [`hue`].
    Hue,
    /// [`saturation`].
    Saturation,
    /// Caller-supplied key.
    Custom(fn(&Pixel) -> u16),
}

impl SortKey {
    /// Key value of `p`.
    #[inline]
    pub fn eval(&self, p: &Pixel) -> u16 {
        match self {
            Self::Luminance => luminance(p),
            Self::Hue => hue(p),
            Self::Saturation => saturation(p),
            Self::Custom(f) => f(p),
        }
    }

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Luminance => "luminance",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
