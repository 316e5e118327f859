//! Multi-pass glitch pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`Pass`]es. Each pass builds a
//! traversal for the image and runs one reorder over it. Every pass is
//! validated and every traversal built before the first pixel moves, so a
//! failing pipeline leaves the buffer exactly as it was.

use crate::buffer::PixelBuffer;
use crate::error::{GlitchError, PreconditionViolation};
use crate::limits::{ResourceLimits, estimate_memory};
use crate::order::{CurveOrder, Traversal};
use crate::pixel::SortKey;
use crate::ppm;
use crate::reorder::{ReorderConfig, ReorderEngine, SortAlgorithm};

/// Random span bound of the curve pass in [`Pipeline::hilbert_glitch`].
pub const HILBERT_GLITCH_SPAN: usize = 500;

/// Random span bound of the row pass in [`Pipeline::hilbert_glitch`].
pub const GLITCH_ROW_SPAN: usize = 40;

/// One traversal plus one reorder.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pass {
    /// How the grid is walked.
    pub traversal: Traversal,
    /// Explicit Hilbert order; derived from the image when `None`.
    pub order: Option<u32>,
    /// Walk the traversal back to front.
    pub reverse: bool,
    /// What happens along the walk.
    pub reorder: ReorderConfig,
}

impl Pass {
    /// Pass with the default Hilbert traversal.
    pub fn new(reorder: ReorderConfig) -> Self {
        Self {
            reorder,
            ..Self::default()
        }
    }

    /// Set the traversal.
    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Override the Hilbert order.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    /// Reverse the walk.
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Build this pass's traversal for a `width × height` image.
    pub fn curve_order(&self, width: usize, height: usize) -> Result<CurveOrder, PreconditionViolation> {
        let order = CurveOrder::build(self.traversal, width, height, self.order)?;
        Ok(if self.reverse { order.reversed() } else { order })
    }
}

/// Ordered reorder passes with resource limits.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    passes: Vec<Pass>,
    limits: ResourceLimits,
}

impl Pipeline {
    /// Empty pipeline with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-pass pipeline.
    pub fn single(pass: Pass) -> Self {
        Self::new().with_pass(pass)
    }

    /// Hue sort along a generalized Hilbert curve in random spans shorter
    /// than [`HILBERT_GLITCH_SPAN`], then a glitch sort by hue of every row
    /// in random spans shorter than [`GLITCH_ROW_SPAN`]. The row pass is
    /// seeded with `seed + 1`.
    pub fn hilbert_glitch(seed: u64) -> Self {
        Self::new()
            .with_pass(
                Pass::new(
                    ReorderConfig::new()
                        .with_random_spans(HILBERT_GLITCH_SPAN)
                        .with_seed(seed)
                        .with_key(SortKey::Hue),
                )
                .with_traversal(Traversal::Gilbert),
            )
            .with_pass(
                Pass::new(
                    ReorderConfig::new()
                        .with_random_spans(GLITCH_ROW_SPAN)
                        .with_seed(seed.wrapping_add(1))
                        .with_key(SortKey::Hue)
                        .with_algorithm(SortAlgorithm::Glitch),
                )
                .with_traversal(Traversal::HorizontalLines),
            )
    }

    /// Append a pass.
    pub fn with_pass(mut self, pass: Pass) -> Self {
        self.passes.push(pass);
        self
    }

    /// Replace the limits.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The passes, in run order.
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// The limits.
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Check `width × height` against the limits, including the working
    /// memory of every pass.
    pub fn check_limits(&self, width: u64, height: u64) -> Result<(), GlitchError> {
        self.limits.check_dimensions(width, height)?;
        let bytes = estimate_memory(width, height, self.passes.len());
        tracing::debug!(width, height, passes = self.passes.len(), bytes, "estimated working memory");
        self.limits.check_memory(bytes)?;
        Ok(())
    }

    /// Run every pass over `buffer`.
    pub fn run(&self, buffer: &mut PixelBuffer) -> Result<(), GlitchError> {
        let (width, height) = (buffer.width(), buffer.height());
        self.check_limits(
            u64::try_from(width).unwrap_or(u64::MAX),
            u64::try_from(height).unwrap_or(u64::MAX),
        )?;

        let prepared = self
            .passes
            .iter()
            .map(|pass| {
                let engine = ReorderEngine::new(pass.reorder)?;
                let order = pass.curve_order(width, height)?;
                Ok((pass, engine, order))
            })
            .collect::<Result<Vec<_>, PreconditionViolation>>()?;

        for (i, (pass, engine, order)) in prepared.iter().enumerate() {
            tracing::info!(
                pass = i + 1,
                of = prepared.len(),
                traversal = %pass.traversal,
                mode = ?engine.config().mode,
                key = %engine.config().key,
                "running pass"
            );
            engine.apply(buffer, order)?;
        }
        Ok(())
    }

    /// Decode a `P6` image, run every pass, and encode the result. The
    /// limits are checked against the header before the raster is decoded.
    pub fn process_ppm(&self, data: &[u8]) -> Result<Vec<u8>, GlitchError> {
        let header = ppm::parse_header(data)?;
        self.check_limits(u64::from(header.width), u64::from(header.height))?;
        let mut image = ppm::decode(data, &self.limits)?;
        self.run(&mut image.pixels)?;
        image.encode()
    }
}
