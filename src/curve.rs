//! Hilbert curve indexing.
//!
//! Maps between `(x, y)` cells of a `2^order × 2^order` square and the
//! distance `d ∈ [0, 4^order)` along the Hilbert curve. Both directions are
//! pure functions of their inputs and safe to call from any thread.

use crate::error::PreconditionViolation;

/// Largest supported curve order. Side length `2^31` still fits `u32`
/// coordinates and `4^31` cells fit a `u64` distance.
pub const MAX_ORDER: u32 = 31;

/// Rotate/flip a quadrant so the sub-curve has the canonical orientation.
#[inline(always)]
fn rot(n: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}

/// A Hilbert curve of a fixed order.
///
/// ```
/// use zenglitch::HilbertCurve;
///
/// let curve = HilbertCurve::new(2)?;
/// assert_eq!(curve.side(), 4);
/// assert_eq!(curve.distance_of(0, 0)?, 0);
/// let d = curve.distance_of(3, 1)?;
/// assert_eq!(curve.coordinate_of(d)?, (3, 1));
/// # Ok::<(), zenglitch::PreconditionViolation>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HilbertCurve {
    order: u32,
}

impl HilbertCurve {
    /// Create a curve covering a `2^order` square.
    ///
    /// Fails for `order == 0` and for orders above [`MAX_ORDER`].
    pub fn new(order: u32) -> Result<Self, PreconditionViolation> {
        if order == 0 || order > MAX_ORDER {
            return Err(PreconditionViolation::InvalidOrder {
                order,
                max: MAX_ORDER,
            });
        }
        Ok(Self { order })
    }

    /// Smallest order whose square covers a `width × height` grid.
    ///
    /// Never less than 1, so a 1×1 image still gets a 2×2 curve. Sides
    /// beyond the largest power of two in `usize` yield `usize::BITS`, which
    /// [`HilbertCurve::new`] rejects.
    pub fn order_for(width: usize, height: usize) -> u32 {
        match width.max(height).max(2).checked_next_power_of_two() {
            Some(side) => side.trailing_zeros(),
            None => usize::BITS,
        }
    }

    /// Curve order `k`.
    #[inline]
    pub fn order(self) -> u32 {
        self.order
    }

    /// Side length `2^order`.
    #[inline]
    pub fn side(self) -> u64 {
        1u64 << self.order
    }

    /// Number of cells `4^order`.
    #[inline]
    pub fn cells(self) -> u64 {
        1u64 << (2 * self.order)
    }

    /// Distance along the curve of cell `(x, y)`.
    pub fn distance_of(self, x: u64, y: u64) -> Result<u64, PreconditionViolation> {
        let side = self.side();
        if x >= side || y >= side {
            return Err(PreconditionViolation::CoordinateOutOfRange { x, y, side });
        }
        Ok(self.distance_unchecked(x, y))
    }

    /// Cell `(x, y)` at distance `d` along the curve.
    pub fn coordinate_of(self, d: u64) -> Result<(u64, u64), PreconditionViolation> {
        let cells = self.cells();
        if d >= cells {
            return Err(PreconditionViolation::DistanceOutOfRange { distance: d, cells });
        }
        Ok(self.coordinate_unchecked(d))
    }

    /// Walks the quadrant bits from most to least significant, appending two
    /// bits of distance per level. Caller guarantees `x, y < side`.
    #[inline]
    pub(crate) fn distance_unchecked(self, mut x: u64, mut y: u64) -> u64 {
        let n = self.side();
        let mut d = 0u64;
        let mut s = n >> 1;
        while s > 0 {
            let rx = u64::from(x & s != 0);
            let ry = u64::from(y & s != 0);
            d = (d << 2) | ((3 * rx) ^ ry);
            rot(n, &mut x, &mut y, rx, ry);
            s >>= 1;
        }
        d
    }

    /// Rebuilds the cell from the lowest pair of distance bits upward.
    /// Caller guarantees `d < cells`.
    #[inline]
    pub(crate) fn coordinate_unchecked(self, d: u64) -> (u64, u64) {
        let n = self.side();
        let (mut x, mut y) = (0u64, 0u64);
        let mut t = d;
        let mut s = 1u64;
        while s < n {
            let rx = 1 & (t >> 1);
            let ry = 1 & (t ^ rx);
            rot(s, &mut x, &mut y, rx, ry);
            x += s * rx;
            y += s * ry;
            t >>= 2;
            s <<= 1;
        }
        (x, y)
    }

    /// Every cell of the square in curve order.
    pub fn coordinates(self) -> impl Iterator<Item = (u64, u64)> {
        (0..self.cells()).map(move |d| self.coordinate_unchecked(d))
    }
}
