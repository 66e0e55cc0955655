/// A one-dimensional interval `[start, start + length)` along the scroll axis.
///
/// Only the scroll-axis extent matters for caching decisions, so the cross
/// axis is not modelled. `start` may be negative: preheat windows are allowed
/// to reach above the top of the content.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub start: f64,
    pub length: f64,
}

impl Extent {
    /// The zero extent, used as the "nothing preheated yet" state.
    pub const ZERO: Extent = Extent {
        start: 0.0,
        length: 0.0,
    };

    /// Creates an extent. Negative lengths are clamped to zero.
    pub fn new(start: f64, length: f64) -> Self {
        Self {
            start,
            length: length.max(0.0),
        }
    }

    /// Creates the extent covering `[start, end)`.
    pub fn from_bounds(start: f64, end: f64) -> Self {
        Self::new(start, end - start)
    }

    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    pub fn center(&self) -> f64 {
        self.start + self.length / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.length <= 0.0
    }

    /// True if the two extents share a region of positive length.
    /// Touching edges and empty extents never intersect.
    pub fn intersects(&self, other: &Extent) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end()
            && other.start < self.end()
    }

    /// Grows the extent by `amount` on both sides.
    pub fn outset(&self, amount: f64) -> Self {
        Self::new(self.start - amount, self.length + 2.0 * amount)
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end()
    }
}
