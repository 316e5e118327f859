//! Error types.
//!
//! Every failure is reported before any pixel is written. Callers either get
//! a fully transformed buffer or one of these errors with the buffer untouched.

use thiserror::Error;

use crate::limits::LimitExceeded;

/// Convenience alias used throughout the crate.
pub type Result<T, E = GlitchError> = std::result::Result<T, E>;

/// Top-level error for curve construction, reordering, and PPM I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GlitchError {
    /// A caller-supplied argument violates an invariant of the operation.
    #[error("precondition violated: {0}")]
    Precondition(#[from] PreconditionViolation),

    /// Input bytes could not be turned into a pixel buffer.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// A configured resource limit was exceeded.
    #[error("resource limit exceeded: {0}")]
    Limit(#[from] LimitExceeded),
}

/// An invariant of a curve, order, or reorder configuration was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PreconditionViolation {
    /// Curve order outside `1..=MAX_ORDER`.
    #[error("curve order {order} is outside 1..={max}")]
    InvalidOrder {
        /// Requested order.
        order: u32,
        /// Largest supported order.
        max: u32,
    },

    /// An explicit order override cannot cover the image.
    #[error("curve order {order} covers {side}x{side}, image needs order {required}")]
    OrderTooSmall {
        /// Requested order.
        order: u32,
        /// Side length of the requested order.
        side: u64,
        /// Smallest order that covers the image.
        required: u32,
    },

    /// Coordinate outside the curve's square.
    #[error("coordinate ({x}, {y}) is outside a {side}x{side} curve")]
    CoordinateOutOfRange {
        /// X coordinate.
        x: u64,
        /// Y coordinate.
        y: u64,
        /// Curve side length.
        side: u64,
    },

    /// Curve distance outside `[0, 4^order)`.
    #[error("curve distance {distance} is outside 0..{cells}")]
    DistanceOutOfRange {
        /// Requested distance.
        distance: u64,
        /// Number of cells on the curve.
        cells: u64,
    },

    /// A curve order and a pixel buffer disagree on dimensions.
    #[error("curve order is {expected_width}x{expected_height}, buffer is {actual_width}x{actual_height}")]
    DimensionMismatch {
        /// Width the order was built for.
        expected_width: usize,
        /// Height the order was built for.
        expected_height: usize,
        /// Width of the buffer.
        actual_width: usize,
        /// Height of the buffer.
        actual_height: usize,
    },

    /// Width or height is zero, or their product overflows.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        /// Width.
        width: usize,
        /// Height.
        height: usize,
    },

    /// Fixed segments must hold at least one pixel.
    #[error("segment length must be at least 1")]
    ZeroSegmentLength,

    /// Random spans need room for at least one length, so `max >= 2`.
    #[error("random span limit {max} is below 2")]
    SpanLimitTooSmall {
        /// Configured exclusive upper bound of the span length.
        max: usize,
    },

    /// Threshold segmenter with `min > max`.
    #[error("threshold range {min}..={max} is empty")]
    EmptyThreshold {
        /// Lower bound.
        min: u16,
        /// Upper bound.
        max: u16,
    },

    /// An explicit traversal repeats or skips pixel indices.
    #[error("traversal of {len} positions visits only {distinct} distinct pixels")]
    NotAPermutation {
        /// Number of positions.
        len: usize,
        /// Distinct in-range indices among them.
        distinct: usize,
    },

    /// Custom traversals only come from an explicit permutation.
    #[error("custom traversals are built from explicit positions")]
    CustomTraversal,

    /// Pixel vector length does not equal `width * height`.
    #[error("expected {expected} pixels, got {actual}")]
    PixelCount {
        /// `width * height`.
        expected: usize,
        /// Supplied pixel count.
        actual: usize,
    },
}

/// Raw image bytes could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Fewer raster bytes than the declared dimensions require.
    #[error("truncated pixel data: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by `width * height * channels`.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// More raster bytes than the declared dimensions allow.
    #[error("excess pixel data: expected {expected} bytes, got {actual}")]
    ExcessData {
        /// Bytes required by `width * height * channels`.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// The PPM header is malformed.
    #[error("invalid PPM header: {0}")]
    InvalidHeader(&'static str),

    /// Only 8-bit rasters (maxval 1..=255) are supported.
    #[error("unsupported max color value {0}")]
    UnsupportedMaxValue(u32),
}
