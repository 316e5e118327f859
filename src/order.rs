//! Traversal orders over a pixel grid.
//!
//! A [`CurveOrder`] is a permutation of `[0, width * height)` that maps a
//! traversal position to a row-major pixel index, cut into lines. Curves and
//! scans are a single line; the geometric traversals (rays, circles,
//! diagonals, ...) produce many. It depends only on the grid dimensions and
//! the traversal, owns no pixel data, and clones cheaply, so one order can be
//! shared by every buffer of the same size.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;

use crate::curve::HilbertCurve;
use crate::error::PreconditionViolation;
use crate::path;

/// How the grid is walked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Traversal {
    /// Hilbert curve over the smallest covering power-of-two square.
    /// Padding cells outside the image are skipped.
    #[default]
    Hilbert,
    /// Generalized Hilbert curve that fits any rectangle without padding.
    Gilbert,
    /// Row-major scan, left to right, top to bottom, as one line.
    Rows,
    /// Column-major scan, top to bottom, left to right, as one line.
    Columns,
    /// One line per row.
    HorizontalLines,
    /// One line per column.
    VerticalLines,
    /// Parallel straight lines tilted by the given degrees from vertical.
    /// `0` walks columns downwards, `90` walks rows right to left.
    Diagonal(i32),
    /// Lines from the center out to every border pixel.
    Rays,
    /// Concentric circle halves around the center.
    Circles,
    /// One round spiral out of the center.
    Spiral,
    /// One square spiral out of the center.
    SquareSpiral,
    /// One rectangular spiral following the image's aspect ratio.
    RectSpiral,
    /// Caller-supplied permutation, see [`CurveOrder::from_positions`].
    Custom,
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hilbert => f.write_str("hilbert"),
            Self::Gilbert => f.write_str("gilbert"),
            Self::Rows => f.write_str("rows"),
            Self::Columns => f.write_str("columns"),
            Self::HorizontalLines => f.write_str("horizontal-lines"),
            Self::VerticalLines => f.write_str("vertical-lines"),
            Self::Diagonal(degrees) => write!(f, "diagonal({degrees})"),
            Self::Rays => f.write_str("rays"),
            Self::Circles => f.write_str("circles"),
            Self::Spiral => f.write_str("spiral"),
            Self::SquareSpiral => f.write_str("square-spiral"),
            Self::RectSpiral => f.write_str("rect-spiral"),
            Self::Custom => f.write_str("custom"),
        }
    }
}

/// An immutable traversal permutation for a fixed `width × height` grid.
#[derive(Clone, PartialEq, Eq)]
pub struct CurveOrder {
    width: usize,
    height: usize,
    traversal: Traversal,
    positions: Arc<[usize]>,
    /// Start offset of every line into `positions`; the first is always 0.
    lines: Arc<[usize]>,
}

impl fmt::Debug for CurveOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveOrder")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("traversal", &self.traversal)
            .field("len", &self.positions.len())
            .field("lines", &self.lines.len())
            .finish()
    }
}

fn pixel_count(width: usize, height: usize) -> Result<usize, PreconditionViolation> {
    match width.checked_mul(height) {
        Some(n) if n > 0 => Ok(n),
        _ => Err(PreconditionViolation::InvalidDimensions { width, height }),
    }
}

impl CurveOrder {
    /// Hilbert order for `width × height`, deriving the curve order from the
    /// dimensions.
    pub fn hilbert(width: usize, height: usize) -> Result<Self, PreconditionViolation> {
        Self::build(Traversal::Hilbert, width, height, None)
    }

    /// Build an order for `traversal`.
    ///
    /// `order` overrides the derived Hilbert order; it must still cover the
    /// image. It is ignored by the other traversals. [`Traversal::Custom`]
    /// cannot be built here; use [`from_positions`](Self::from_positions).
    pub fn build(
        traversal: Traversal,
        width: usize,
        height: usize,
        order: Option<u32>,
    ) -> Result<Self, PreconditionViolation> {
        let count = pixel_count(width, height)?;
        let (positions, lines) = match traversal {
            Traversal::Hilbert => (hilbert_positions(width, height, order)?, vec![0]),
            Traversal::Gilbert => (gilbert_positions(width, height), vec![0]),
            Traversal::Rows => ((0..count).collect(), vec![0]),
            Traversal::Columns => (path::vertical_lines(width, height).concat(), vec![0]),
            Traversal::HorizontalLines => assemble(path::horizontal_lines(width, height), count),
            Traversal::VerticalLines => assemble(path::vertical_lines(width, height), count),
            Traversal::Diagonal(degrees) => {
                assemble(path::diagonal_lines(width, height, degrees), count)
            }
            Traversal::Rays => assemble(path::rays(width, height), count),
            Traversal::Circles => assemble(path::circles(width, height), count),
            Traversal::Spiral => assemble(path::round_spiral(width, height), count),
            Traversal::SquareSpiral => assemble(path::rect_spiral(width, height, true), count),
            Traversal::RectSpiral => assemble(path::rect_spiral(width, height, false), count),
            Traversal::Custom => return Err(PreconditionViolation::CustomTraversal),
        };
        debug_assert_eq!(positions.len(), count);
        tracing::debug!(%traversal, width, height, pixels = count, lines = lines.len(), "built curve order");
        Ok(Self {
            width,
            height,
            traversal,
            positions: positions.into(),
            lines: lines.into(),
        })
    }

    /// Wrap an explicit permutation as a single [`Traversal::Custom`] line.
    ///
    /// Fails unless `positions` contains every index of `[0, width * height)`
    /// exactly once.
    pub fn from_positions(
        width: usize,
        height: usize,
        positions: Vec<usize>,
    ) -> Result<Self, PreconditionViolation> {
        let count = pixel_count(width, height)?;
        if positions.len() != count {
            return Err(PreconditionViolation::PixelCount {
                expected: count,
                actual: positions.len(),
            });
        }
        let distinct = distinct_in_range(&positions);
        if distinct != count {
            return Err(PreconditionViolation::NotAPermutation {
                len: count,
                distinct,
            });
        }
        Ok(Self {
            width,
            height,
            traversal: Traversal::Custom,
            positions: positions.into(),
            lines: Arc::new([0]),
        })
    }

    /// Grid width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Traversal this order was built from.
    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    /// Number of positions (`width * height`).
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a constructed order.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Row-major pixel index at traversal position `position`.
    pub fn index_at(&self, position: usize) -> Option<usize> {
        self.positions.get(position).copied()
    }

    /// Traversal position → row-major pixel index, for every position.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Position ranges of the lines, in walk order. The ranges are
    /// non-empty, contiguous, and cover `0..len()`.
    pub fn lines(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let ends = self
            .lines
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(self.positions.len()));
        self.lines.iter().copied().zip(ends).map(|(start, end)| start..end)
    }

    /// Traversal position of row-major pixel `index`. Linear scan; use
    /// [`ranks`](Self::ranks) for bulk lookups.
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.positions.iter().position(|&i| i == index)
    }

    /// Inverse permutation: row-major pixel index → traversal position.
    pub fn ranks(&self) -> Vec<usize> {
        let mut ranks = vec![0usize; self.positions.len()];
        for (position, &index) in self.positions.iter().enumerate() {
            ranks[index] = position;
        }
        ranks
    }

    /// Same cells walked back to front. Lines are reversed too, so each
    /// line keeps its pixels.
    pub fn reversed(&self) -> Self {
        let len = self.positions.len();
        let mut positions = self.positions.to_vec();
        positions.reverse();
        let ranges: Vec<Range<usize>> = self.lines().collect();
        let lines: Vec<usize> = ranges.iter().rev().map(|line| len - line.end).collect();
        Self {
            width: self.width,
            height: self.height,
            traversal: self.traversal,
            positions: positions.into(),
            lines: lines.into(),
        }
    }

    /// Fail unless this order was built for a `width × height` grid.
    pub fn check_dimensions(&self, width: usize, height: usize) -> Result<(), PreconditionViolation> {
        if self.width != width || self.height != height {
            return Err(PreconditionViolation::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }
        Ok(())
    }
}

/// Whether `positions` is a permutation of `[0, positions.len())`.
pub fn is_permutation(positions: &[usize]) -> bool {
    distinct_in_range(positions) == positions.len()
}

fn distinct_in_range(positions: &[usize]) -> usize {
    let mut seen = vec![false; positions.len()];
    let mut distinct = 0;
    for &index in positions {
        if let Some(slot) = seen.get_mut(index)
            && !*slot
        {
            *slot = true;
            distinct += 1;
        }
    }
    distinct
}

/// Concatenate generated lines into a permutation plus line starts.
///
/// The first line to reach a pixel claims it; later visits are dropped and
/// lines left empty vanish. Pixels no line reached are appended in
/// row-major order as single-pixel lines, so sorting never moves them.
fn assemble(lines: Vec<Vec<usize>>, count: usize) -> (Vec<usize>, Vec<usize>) {
    let mut claimed = vec![false; count];
    let mut positions = Vec::with_capacity(count);
    let mut starts = Vec::with_capacity(lines.len());
    for line in lines {
        let start = positions.len();
        positions.extend(
            line.into_iter()
                .filter(|&i| !std::mem::replace(&mut claimed[i], true)),
        );
        if positions.len() > start {
            starts.push(start);
        }
    }
    let reached = positions.len();
    for (index, _) in claimed.iter().enumerate().filter(|(_, c)| !**c) {
        starts.push(positions.len());
        positions.push(index);
    }
    if reached < count {
        tracing::trace!(unreached = count - reached, "parking pixels outside every line");
    }
    (positions, starts)
}

/// Pixels sorted by their distance on the covering Hilbert curve. Costs
/// `O(n log n)` in the pixel count, independent of the padded square.
fn hilbert_positions(
    width: usize,
    height: usize,
    order: Option<u32>,
) -> Result<Vec<usize>, PreconditionViolation> {
    let required = HilbertCurve::order_for(width, height);
    let order = order.unwrap_or(required);
    let curve = HilbertCurve::new(order)?;
    if order < required {
        return Err(PreconditionViolation::OrderTooSmall {
            order,
            side: curve.side(),
            required,
        });
    }
    tracing::trace!(order, pixels = width * height, "ranking pixels by hilbert distance");
    let mut keyed: Vec<(u64, usize)> = (0..width * height)
        .into_par_iter()
        .map(|i| {
            let (x, y) = ((i % width) as u64, (i / width) as u64);
            (curve.distance_unchecked(x, y), i)
        })
        .collect();
    // Distances are unique, so an unstable sort is deterministic.
    keyed.par_sort_unstable_by_key(|&(d, _)| d);
    Ok(keyed.into_par_iter().map(|(_, i)| i).collect())
}

fn gilbert_positions(width: usize, height: usize) -> Vec<usize> {
    let mut cells = Vec::with_capacity(width * height);
    let (w, h) = (width as i64, height as i64);
    if w >= h {
        gilbert(&mut cells, 0, 0, w, 0, 0, h);
    } else {
        gilbert(&mut cells, 0, 0, 0, h, w, 0);
    }
    cells
        .into_iter()
        .map(|(x, y)| y as usize * width + x as usize)
        .collect()
}

/// Generalized Hilbert curve over the rectangle spanned by the major axis
/// `(ax, ay)` and minor axis `(bx, by)` starting at `(x, y)`.
fn gilbert(cells: &mut Vec<(i64, i64)>, x: i64, y: i64, ax: i64, ay: i64, bx: i64, by: i64) {
    let w = (ax + ay).abs();
    let h = (bx + by).abs();
    let (dax, day) = (ax.signum(), ay.signum());
    let (dbx, dby) = (bx.signum(), by.signum());

    if h == 1 {
        cells.extend((0..w).map(|i| (x + i * dax, y + i * day)));
        return;
    }
    if w == 1 {
        cells.extend((0..h).map(|i| (x + i * dbx, y + i * dby)));
        return;
    }

    let (mut ax2, mut ay2) = (ax / 2, ay / 2);
    let (mut bx2, mut by2) = (bx / 2, by / 2);
    let w2 = (ax2 + ay2).abs();
    let h2 = (bx2 + by2).abs();

    if 2 * w > 3 * h {
        // Long rectangle: split along the major axis only.
        if w2 % 2 != 0 && w > 2 {
            ax2 += dax;
            ay2 += day;
        }
        gilbert(cells, x, y, ax2, ay2, bx, by);
        gilbert(cells, x + ax2, y + ay2, ax - ax2, ay - ay2, bx, by);
    } else {
        if h2 % 2 != 0 && h > 2 {
            bx2 += dbx;
            by2 += dby;
        }
        gilbert(cells, x, y, bx2, by2, ax2, ay2);
        gilbert(cells, x + bx2, y + by2, ax, ay, bx - bx2, by - by2);
        gilbert(
            cells,
            x + (ax - dax) + (bx2 - dbx),
            y + (ay - day) + (by2 - dby),
            -bx2,
            -by2,
            -(ax - ax2),
            -(ay - ay2),
        );
    }
}
