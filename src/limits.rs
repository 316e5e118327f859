//! Resource limits for decode and pipeline runs.
//!
//! [`ResourceLimits`] caps what a single image may cost. Checks run on the
//! header or buffer dimensions before any traversal is built, so a rejected
//! image never allocates its working set.

use std::fmt;
use std::mem::size_of;
use std::ops::Range;

use crate::pixel::Pixel;

/// Caps on image size and working memory. `None` means unlimited.
///
/// ```
/// use zenglitch::ResourceLimits;
///
/// let limits = ResourceLimits::none()
///     .with_max_pixels(100_000_000)
///     .with_max_memory(512 * 1024 * 1024);
/// assert!(limits.check_dimensions(8000, 8000).is_ok());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ResourceLimits {
    /// Maximum total pixels (width × height).
    pub max_pixels: Option<u64>,
    /// Maximum estimated working memory in bytes, see [`estimate_memory`].
    pub max_memory_bytes: Option<u64>,
    /// Maximum image width in pixels.
    pub max_width: Option<u64>,
    /// Maximum image height in pixels.
    pub max_height: Option<u64>,
    /// Maximum input file size in bytes.
    pub max_file_size: Option<u64>,
}

impl ResourceLimits {
    /// No limits.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set maximum total pixels.
    pub fn with_max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = Some(max);
        self
    }

    /// Set maximum working memory in bytes.
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    /// Set maximum image width.
    pub fn with_max_width(mut self, width: u64) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Set maximum image height.
    pub fn with_max_height(mut self, height: u64) -> Self {
        self.max_height = Some(height);
        self
    }

    /// Set maximum input file size in bytes.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Check width, height, and pixel count. A pixel count that overflows
    /// `u64` exceeds any pixel limit.
    pub fn check_dimensions(&self, width: u64, height: u64) -> Result<(), LimitExceeded> {
        check(Resource::Width, width, self.max_width)?;
        check(Resource::Height, height, self.max_height)?;
        let pixels = width.checked_mul(height).unwrap_or(u64::MAX);
        check(Resource::Pixels, pixels, self.max_pixels)
    }

    /// Check a memory estimate against `max_memory_bytes`.
    pub fn check_memory(&self, bytes: u64) -> Result<(), LimitExceeded> {
        check(Resource::Memory, bytes, self.max_memory_bytes)
    }

    /// Check input file size against `max_file_size`.
    pub fn check_file_size(&self, bytes: u64) -> Result<(), LimitExceeded> {
        check(Resource::FileSize, bytes, self.max_file_size)
    }
}

fn check(resource: Resource, actual: u64, max: Option<u64>) -> Result<(), LimitExceeded> {
    match max {
        Some(max) if actual > max => Err(LimitExceeded {
            resource,
            actual,
            max,
        }),
        _ => Ok(()),
    }
}

/// Peak working memory, in bytes, of running `passes` passes over a
/// `width × height` image. Saturates at `u64::MAX`.
///
/// Per pixel: the buffer and its gathered walk, the `(distance, index)`
/// pairs a Hilbert order is ranked by, one segment range, and for every
/// pass its positions and line starts. All orders are built before the
/// first pass runs, so their cost adds up.
pub fn estimate_memory(width: u64, height: u64, passes: usize) -> u64 {
    let fixed = 2 * size_of::<Pixel>() + size_of::<(u64, usize)>() + size_of::<Range<usize>>();
    let per_pass = 2 * size_of::<usize>() as u64;
    let per_pixel = (passes as u64)
        .checked_mul(per_pass)
        .and_then(|p| p.checked_add(fixed as u64));
    width
        .checked_mul(height)
        .zip(per_pixel)
        .and_then(|(pixels, per_pixel)| pixels.checked_mul(per_pixel))
        .unwrap_or(u64::MAX)
}

/// The resource a [`LimitExceeded`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Resource {
    /// Image width.
    Width,
    /// Image height.
    Height,
    /// Width × height.
    Pixels,
    /// Estimated working memory in bytes.
    Memory,
    /// Input size in bytes.
    FileSize,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Pixels => "pixel count",
            Self::Memory => "memory",
            Self::FileSize => "file size",
        })
    }
}

/// A resource limit was exceeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitExceeded {
    /// Which limit.
    pub resource: Resource,
    /// Measured or estimated value.
    pub actual: u64,
    /// Configured maximum.
    pub max: u64,
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.resource {
            Resource::Memory | Resource::FileSize => " bytes",
            _ => "",
        };
        write!(
            f,
            "{} {}{unit} exceeds limit {}",
            self.resource, self.actual, self.max
        )
    }
}

impl std::error::Error for LimitExceeded {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limits_accept_anything() {
        let limits = ResourceLimits::none();
        assert!(limits.check_dimensions(u64::MAX, u64::MAX).is_ok());
        assert!(limits.check_memory(u64::MAX).is_ok());
        assert!(limits.check_file_size(u64::MAX).is_ok());
    }

    #[test]
    fn dimensions_are_checked_in_order() {
        let limits = ResourceLimits::none()
            .with_max_width(1920)
            .with_max_height(1080)
            .with_max_pixels(1_000_000);
        assert!(limits.check_dimensions(1000, 1000).is_ok());
        assert_eq!(
            limits.check_dimensions(1921, 1),
            Err(LimitExceeded {
                resource: Resource::Width,
                actual: 1921,
                max: 1920
            })
        );
        assert_eq!(
            limits.check_dimensions(1, 1081).map_err(|e| e.resource),
            Err(Resource::Height)
        );
        assert_eq!(
            limits.check_dimensions(1001, 1000),
            Err(LimitExceeded {
                resource: Resource::Pixels,
                actual: 1_001_000,
                max: 1_000_000
            })
        );
    }

    #[test]
    fn overflowing_pixel_count_exceeds_pixel_limit() {
        let limits = ResourceLimits::none().with_max_pixels(u64::MAX - 1);
        assert_eq!(
            limits.check_dimensions(u64::MAX, 2).map_err(|e| e.actual),
            Err(u64::MAX)
        );
    }

    #[test]
    fn memory_and_file_size() {
        let limits = ResourceLimits::none()
            .with_max_memory(1024)
            .with_max_file_size(2048);
        assert!(limits.check_memory(1024).is_ok());
        assert_eq!(
            limits.check_memory(4096).map_err(|e| e.resource),
            Err(Resource::Memory)
        );
        assert!(limits.check_file_size(2048).is_ok());
        assert_eq!(
            limits.check_file_size(2049).map_err(|e| e.resource),
            Err(Resource::FileSize)
        );
    }

    #[test]
    fn memory_estimate_grows_with_pixels_and_passes() {
        assert_eq!(estimate_memory(0, 10, 3), 0);
        assert!(estimate_memory(20, 20, 1) > estimate_memory(10, 10, 1));
        let one = estimate_memory(64, 64, 1);
        let two = estimate_memory(64, 64, 2);
        assert_eq!(two - one, 64 * 64 * 2 * size_of::<usize>() as u64);
    }

    #[test]
    fn memory_estimate_saturates() {
        assert_eq!(estimate_memory(u64::from(u32::MAX), u64::from(u32::MAX), 1), u64::MAX);
        assert_eq!(estimate_memory(2, 2, usize::MAX), u64::MAX);
        assert_eq!(estimate_memory(u64::MAX, 2, 0), u64::MAX);
    }

    #[test]
    fn display_names_the_resource() {
        let err = LimitExceeded {
            resource: Resource::Width,
            actual: 5000,
            max: 4096,
        };
        assert_eq!(err.to_string(), "width 5000 exceeds limit 4096");
        let err = LimitExceeded {
            resource: Resource::FileSize,
            actual: 10,
            max: 8,
        };
        assert_eq!(err.to_string(), "file size 10 bytes exceeds limit 8");
    }
}
