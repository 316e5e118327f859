//! Space-filling-curve pixel reordering for glitch art.
//!
//! Images are walked along a traversal (by default a Hilbert curve) and the
//! pixels are rearranged along that walk:
//!
//! - [`HilbertCurve`]: bijection between `(x, y)` and curve distance
//! - [`CurveOrder`]: immutable traversal permutation for a `width × height`
//!   grid, cut into lines (curves, scans, diagonals, rays, circles, spirals)
//! - [`PixelBuffer`]: owned RGBA grid over `imgref::ImgVec`
//! - [`ReorderEngine`] / [`ReorderConfig`]: remap, unmap, or segment sort along a walk
//! - [`Pipeline`] / [`Pass`]: multi-pass runs with [`ResourceLimits`]
//! - [`ppm`]: binary PPM decode and encode
//!
//! Every reorder is a permutation: the multiset of pixels never changes.
//!
//! ```
//! use zenglitch::{CurveOrder, PixelBuffer, ReorderConfig, ReorderEngine, opaque};
//!
//! let pixels = (0..16u8).map(|i| opaque(i * 16, 0, 0)).collect();
//! let mut buf = PixelBuffer::from_pixels(pixels, 4, 4)?;
//! let order = CurveOrder::hilbert(4, 4)?;
//! ReorderEngine::new(ReorderConfig::remap())?.apply(&mut buf, &order)?;
//! assert_eq!(buf.get_linear(0), Some(opaque(0, 0, 0)));
//! # Ok::<(), zenglitch::GlitchError>(())
//! ```

#![forbid(unsafe_code)]

mod buffer;
mod curve;
mod error;
mod limits;
mod order;
mod path;
mod pipeline;
mod pixel;
pub mod ppm;
mod reorder;

pub use buffer::{PixelBuffer, RGB_CHANNELS, RGBA_CHANNELS};
pub use curve::{HilbertCurve, MAX_ORDER};
pub use error::{DecodeError, GlitchError, PreconditionViolation, Result};
pub use limits::{LimitExceeded, Resource, ResourceLimits, estimate_memory};
pub use order::{CurveOrder, Traversal, is_permutation};
pub use pipeline::{GLITCH_ROW_SPAN, HILBERT_GLITCH_SPAN, Pass, Pipeline};
pub use pixel::{Pixel, SortKey, hue, luminance, opaque, saturation};
pub use reorder::{
    DEFAULT_SEGMENT_LENGTH, ReorderConfig, ReorderEngine, ReorderMode, Segmenter, SortAlgorithm,
};

// Re-exports for callers building buffers directly.
pub use imgref::{ImgRef, ImgVec};
pub use rgb;
pub use rgb::Rgba;
