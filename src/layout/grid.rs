use std::ops::Range;

use crate::config::LayoutConfig;
use crate::geometry::Extent;

/// Fixed-column grid of square cells.
///
/// Cells fill the viewport width left-to-right; the scroll axis is vertical.
/// Row `r` occupies `[r * pitch, r * pitch + cell_size)` where
/// `pitch = cell_size + spacing`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    columns: usize,
    spacing: f64,
    width: f64,
    cell_size: f64,
}

impl GridLayout {
    pub fn new(config: &LayoutConfig, viewport_width: f64) -> Self {
        let mut layout = Self {
            columns: config.columns.max(1),
            spacing: config.spacing.max(0.0),
            width: 0.0,
            cell_size: 0.0,
        };
        layout.set_width(viewport_width);
        layout
    }

    /// Recomputes the cell size for a new viewport width. Returns whether the
    /// cell size changed.
    pub fn set_width(&mut self, viewport_width: f64) -> bool {
        let width = viewport_width.max(0.0);
        let gaps = self.spacing * (self.columns - 1) as f64;
        let cell_size = ((width - gaps) / self.columns as f64).max(0.0);
        self.width = width;
        let changed = cell_size != self.cell_size;
        self.cell_size = cell_size;
        changed
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn pitch(&self) -> f64 {
        self.cell_size + self.spacing
    }

    pub fn rows(&self, count: usize) -> usize {
        count.div_ceil(self.columns)
    }

    /// Total scrollable length for `count` items.
    pub fn content_length(&self, count: usize) -> f64 {
        let rows = self.rows(count);
        if rows == 0 {
            return 0.0;
        }
        rows as f64 * self.cell_size + (rows - 1) as f64 * self.spacing
    }

    /// Scroll-axis extent of the row holding `index`.
    pub fn row_extent(&self, index: usize) -> Extent {
        let row = index / self.columns;
        Extent::new(row as f64 * self.pitch(), self.cell_size)
    }

    /// Indices of cells intersecting `extent`, clamped to `count`.
    ///
    /// # Algorithm
    /// 1. Find the first row whose cell band ends after `extent.start`
    ///    (a start inside the inter-row gap belongs to the next row).
    /// 2. Find the last row whose band starts before `extent.end()`.
    /// 3. Expand the row range to item indices and clamp to the item count.
    pub fn indices_in_extent(&self, extent: Extent, count: usize) -> Range<usize> {
        let pitch = self.pitch();
        if extent.is_empty() || count == 0 || self.cell_size <= 0.0 {
            return 0..0;
        }

        let start = extent.start.max(0.0);
        let end = extent.end();
        if end <= start {
            return 0..0;
        }

        let mut first_row = (start / pitch).floor() as usize;
        if start - first_row as f64 * pitch >= self.cell_size {
            first_row = first_row.saturating_add(1);
        }
        let end_row = (end / pitch).ceil() as usize;
        if end_row <= first_row {
            return 0..0;
        }

        // Rows past the content are clamped before scaling to indices; an
        // unbounded extent saturates the row casts above.
        let rows = self.rows(count);
        let first = (first_row.min(rows) * self.columns).min(count);
        let last = (end_row.min(rows) * self.columns).min(count);
        first..last
    }
}
