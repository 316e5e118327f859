//! Pixel reordering along a traversal.
//!
//! [`ReorderEngine`] rewrites a [`PixelBuffer`] according to a
//! [`CurveOrder`]. Every mode only moves pixels, so the multiset of pixel
//! values is the same before and after. All checks run before the first
//! write; once they pass the transform cannot fail.

use std::mem;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::buffer::PixelBuffer;
use crate::error::PreconditionViolation;
use crate::order::CurveOrder;
use crate::pixel::{Pixel, SortKey};

/// Segment length used when none is configured.
pub const DEFAULT_SEGMENT_LENGTH: usize = 64;

/// Shrink factor of the comb sort gap.
const COMB_SHRINK: f64 = 1.247_330_950_103_979;

/// What the engine does with the traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ReorderMode {
    /// Output slot `d` receives the input pixel at traversal position `d`.
    /// Depends only on the order, not on pixel values.
    Remap,
    /// Inverse of [`Remap`](Self::Remap): input slot `d` moves to traversal
    /// position `d`.
    Unmap,
    /// Sort pixels by key inside segments of the traversal. Pixels keep the
    /// set of positions their segment covers.
    #[default]
    Sort,
}

/// How each line of the traversal is cut into segments for
/// [`ReorderMode::Sort`]. Segments never cross a line boundary.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub enum Segmenter {
    /// Every line is one segment.
    Full,
    /// Consecutive runs of `length` positions; the last run of a line may be
    /// shorter.
    Fixed {
        /// Positions per segment, at least 1.
        length: usize,
    },
    /// Runs of random length in `1..max`, drawn from a generator seeded with
    /// [`ReorderConfig::seed`]. Once a line has fewer positions left than the
    /// drawn length, the rest of the line is one segment.
    Random {
        /// Exclusive upper bound of a run length, at least 2.
        max: usize,
    },
    /// Maximal runs of positions whose `key` lies in `min..=max`.
    /// Positions outside the range are never moved.
    Threshold {
        /// Key used for selection.
        key: SortKey,
        /// Inclusive lower bound.
        min: u16,
        /// Inclusive upper bound.
        max: u16,
    },
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::Fixed {
            length: DEFAULT_SEGMENT_LENGTH,
        }
    }
}

/// Sort applied inside each segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SortAlgorithm {
    /// Stable ascending sort by key.
    #[default]
    Stable,
    /// Comb sort that compares keys truncated to `i8` and swaps through
    /// stale slot bookkeeping. Produces streaky, partially sorted runs.
    Glitch,
    /// Ascending comb sort by key. Not stable: equal keys may swap.
    Comb,
}

/// Configuration for one reorder.
///
/// ```
/// use zenglitch::{ReorderConfig, SortAlgorithm, SortKey};
///
/// let config = ReorderConfig::new()
///     .with_segment_length(32)
///     .with_key(SortKey::Hue)
///     .with_algorithm(SortAlgorithm::Glitch);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ReorderConfig {
    /// Reorder mode.
    pub mode: ReorderMode,
    /// Segment selection for [`ReorderMode::Sort`].
    pub segmenter: Segmenter,
    /// Key pixels are sorted by.
    pub key: SortKey,
    /// Sort algorithm inside a segment.
    pub algorithm: SortAlgorithm,
    /// Seed for [`Segmenter::Random`]. The same seed over the same order
    /// always yields the same segments.
    pub seed: u64,
}

impl ReorderConfig {
    /// Sorted-along-curve with default segment length and luminance key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure traversal remap.
    pub fn remap() -> Self {
        Self::new().with_mode(ReorderMode::Remap)
    }

    /// Inverse traversal remap.
    pub fn unmap() -> Self {
        Self::new().with_mode(ReorderMode::Unmap)
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: ReorderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fixed segments of `length` positions.
    pub fn with_segment_length(mut self, length: usize) -> Self {
        self.segmenter = Segmenter::Fixed { length };
        self
    }

    /// Each line of the traversal is one segment.
    pub fn with_full_lines(mut self) -> Self {
        self.segmenter = Segmenter::Full;
        self
    }

    /// Random segments shorter than `max`.
    pub fn with_random_spans(mut self, max: usize) -> Self {
        self.segmenter = Segmenter::Random { max };
        self
    }

    /// Set the random span seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Threshold segments over `key` in `min..=max`.
    pub fn with_threshold(mut self, key: SortKey, min: u16, max: u16) -> Self {
        self.segmenter = Segmenter::Threshold { key, min, max };
        self
    }

    /// Set the sort key.
    pub fn with_key(mut self, key: SortKey) -> Self {
        self.key = key;
        self
    }

    /// Set the sort algorithm.
    pub fn with_algorithm(mut self, algorithm: SortAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Check the configuration without touching any pixels.
    pub fn validate(&self) -> Result<(), PreconditionViolation> {
        match self.segmenter {
            Segmenter::Fixed { length: 0 } => Err(PreconditionViolation::ZeroSegmentLength),
            Segmenter::Random { max } if max < 2 => {
                Err(PreconditionViolation::SpanLimitTooSmall { max })
            }
            Segmenter::Threshold { min, max, .. } if min > max => {
                Err(PreconditionViolation::EmptyThreshold { min, max })
            }
            _ => Ok(()),
        }
    }
}

/// Applies a validated [`ReorderConfig`] to pixel buffers.
///
/// Holds no state between calls; the same engine can be reused for any
/// number of buffers and orders.
#[derive(Clone, Copy, Debug)]
pub struct ReorderEngine {
    config: ReorderConfig,
}

impl ReorderEngine {
    /// Validate `config` and build an engine.
    pub fn new(config: ReorderConfig) -> Result<Self, PreconditionViolation> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &ReorderConfig {
        &self.config
    }

    /// Reorder `buffer` in place.
    ///
    /// Fails with [`PreconditionViolation::DimensionMismatch`] before any
    /// write if `order` was built for other dimensions.
    pub fn apply(
        &self,
        buffer: &mut PixelBuffer,
        order: &CurveOrder,
    ) -> Result<(), PreconditionViolation> {
        order.check_dimensions(buffer.width(), buffer.height())?;
        match self.config.mode {
            ReorderMode::Sort => {
                let mut walk = gather(buffer.pixels(), order.positions());
                self.sort_walk(&mut walk, order);
                scatter(&walk, order.positions(), buffer.pixels_mut());
            }
            ReorderMode::Remap | ReorderMode::Unmap => {
                let src = buffer.pixels().to_vec();
                self.permute(&src, order, buffer.pixels_mut());
            }
        }
        Ok(())
    }

    /// Reorder `src` into `dst`, leaving `src` untouched.
    ///
    /// `dst` must have the same dimensions as `src`; its previous contents
    /// are overwritten.
    pub fn apply_into(
        &self,
        src: &PixelBuffer,
        order: &CurveOrder,
        dst: &mut PixelBuffer,
    ) -> Result<(), PreconditionViolation> {
        order.check_dimensions(src.width(), src.height())?;
        order.check_dimensions(dst.width(), dst.height())?;
        match self.config.mode {
            ReorderMode::Sort => {
                let mut walk = gather(src.pixels(), order.positions());
                self.sort_walk(&mut walk, order);
                scatter(&walk, order.positions(), dst.pixels_mut());
            }
            ReorderMode::Remap | ReorderMode::Unmap => {
                self.permute(src.pixels(), order, dst.pixels_mut());
            }
        }
        Ok(())
    }

    /// Reorder into a new buffer.
    pub fn apply_to_copy(
        &self,
        src: &PixelBuffer,
        order: &CurveOrder,
    ) -> Result<PixelBuffer, PreconditionViolation> {
        let mut dst = src.clone();
        self.apply(&mut dst, order)?;
        Ok(dst)
    }

    fn permute(&self, src: &[Pixel], order: &CurveOrder, dst: &mut [Pixel]) {
        let positions = order.positions();
        match self.config.mode {
            ReorderMode::Remap => {
                dst.par_iter_mut()
                    .zip(positions.par_iter())
                    .for_each(|(out, &index)| *out = src[index]);
            }
            _ => scatter(src, positions, dst),
        }
    }

    fn sort_walk(&self, walk: &mut [Pixel], order: &CurveOrder) {
        let ReorderConfig { key, algorithm, .. } = self.config;
        let runs = self.segments(walk, order);
        tracing::trace!(segments = runs.len(), lines = order.line_count(), "sorting segments");
        split_runs(walk, &runs)
            .into_par_iter()
            .for_each(|segment| sort_segment(segment, key, algorithm));
    }

    /// Segment ranges of `walk`, in walk order, never crossing a line.
    fn segments(&self, walk: &[Pixel], order: &CurveOrder) -> Vec<Range<usize>> {
        match self.config.segmenter {
            Segmenter::Full => order.lines().collect(),
            Segmenter::Fixed { length } => order
                .lines()
                .flat_map(move |line| {
                    let end = line.end;
                    line.step_by(length).map(move |s| s..(s + length).min(end))
                })
                .collect(),
            Segmenter::Random { max } => {
                let mut rng = StdRng::seed_from_u64(self.config.seed);
                let mut runs = Vec::new();
                for line in order.lines() {
                    random_runs(&mut runs, line, max, &mut rng);
                }
                runs
            }
            Segmenter::Threshold {
                key: select,
                min,
                max,
            } => order
                .lines()
                .flat_map(|line| {
                    let offset = line.start;
                    threshold_runs(&walk[line], select, min, max)
                        .into_iter()
                        .map(move |run| run.start + offset..run.end + offset)
                })
                .collect(),
        }
    }
}

/// Cut `line` into runs of random length in `1..max`; the tail that is
/// shorter than the last draw becomes one run.
fn random_runs(runs: &mut Vec<Range<usize>>, line: Range<usize>, max: usize, rng: &mut StdRng) {
    let mut start = line.start;
    loop {
        let len = rng.random_range(1..max);
        if line.end - start < len {
            break;
        }
        runs.push(start..start + len);
        start += len;
    }
    if start < line.end {
        runs.push(start..line.end);
    }
}

/// Pixels of `src` in traversal order.
fn gather(src: &[Pixel], positions: &[usize]) -> Vec<Pixel> {
    positions.par_iter().map(|&index| src[index]).collect()
}

/// Write traversal-ordered `walk` back to row-major `dst`.
fn scatter(walk: &[Pixel], positions: &[usize], dst: &mut [Pixel]) {
    for (&p, &index) in walk.iter().zip(positions) {
        dst[index] = p;
    }
}

/// Maximal runs of `walk` whose key lies in `min..=max`.
fn threshold_runs(walk: &[Pixel], key: SortKey, min: u16, max: u16) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, p) in walk.iter().enumerate() {
        let inside = (min..=max).contains(&key.eval(p));
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..walk.len());
    }
    runs
}

/// Split `walk` into disjoint mutable slices, one per run. Runs must be
/// sorted and non-overlapping.
fn split_runs<'a>(mut walk: &'a mut [Pixel], runs: &[Range<usize>]) -> Vec<&'a mut [Pixel]> {
    let mut segments = Vec::with_capacity(runs.len());
    let mut offset = 0;
    for run in runs {
        let (_, tail) = mem::take(&mut walk).split_at_mut(run.start - offset);
        let (segment, tail) = tail.split_at_mut(run.len());
        segments.push(segment);
        walk = tail;
        offset = run.end;
    }
    segments
}

fn sort_segment(segment: &mut [Pixel], key: SortKey, algorithm: SortAlgorithm) {
    if segment.len() < 2 {
        return;
    }
    match algorithm {
        SortAlgorithm::Stable => segment.sort_by_cached_key(|p| key.eval(p)),
        SortAlgorithm::Glitch => glitch_sort(segment, key),
        SortAlgorithm::Comb => comb_sort(segment, key),
    }
}

/// Next comb sort gap; stays at 1 once reached.
fn shrink(gap: usize) -> usize {
    if gap > 1 {
        (gap as f64 / COMB_SHRINK) as usize
    } else {
        gap
    }
}

fn comb_sort(segment: &mut [Pixel], key: SortKey) {
    let len = segment.len();
    let mut keyed: Vec<(u16, Pixel)> = segment.iter().map(|p| (key.eval(p), *p)).collect();
    let mut gap = len;
    let mut swapped = false;
    while gap > 1 || swapped {
        gap = shrink(gap);
        swapped = false;
        for i in 0..len - gap {
            if keyed[i + gap].0 < keyed[i].0 {
                keyed.swap(i + gap, i);
                swapped = true;
            }
        }
    }
    for (out, (_, p)) in segment.iter_mut().zip(keyed) {
        *out = p;
    }
}

/// Comb sort over `(slot, key)` pairs. The pairs end up sorted by `key as
/// i8`, but every swap exchanges the pixels at the pairs' original slots,
/// which drift away from the pairs' positions as sorting proceeds.
fn glitch_sort(segment: &mut [Pixel], key: SortKey) {
    let len = segment.len();
    let mut slots: Vec<(usize, i8)> = segment
        .iter()
        .enumerate()
        .map(|(i, p)| (i, key.eval(p) as i8))
        .collect();

    let mut gap = len;
    let mut swapped = false;
    while gap > 1 || swapped {
        gap = shrink(gap);
        swapped = false;
        for i in 0..len - gap {
            if slots[i + gap].1 > slots[i].1 {
                segment.swap(slots[i + gap].0, slots[i].0);
                slots.swap(i + gap, i);
                swapped = true;
            }
        }
    }
}
