use crate::geometry::Extent;
use crate::models::{CollectionSnapshot, ItemId};

use super::GridLayout;

/// What the preheat logic needs from the presentation layer.
pub trait ViewportQuery {
    fn visible_extent(&self) -> Extent;

    /// Identifiers of the items whose cells intersect `extent`. An extent
    /// with no items yields an empty list.
    fn items_in_extent(&self, extent: Extent) -> Vec<ItemId>;
}

/// Scroll position and size of the visible area, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            offset: 0.0,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn visible_extent(&self) -> Extent {
        Extent::new(self.offset, self.height)
    }

    /// Scrolls to `offset`, clamped to the scrollable range for
    /// `content_length`.
    pub fn scroll_to(&mut self, offset: f64, content_length: f64) {
        let max_offset = (content_length - self.height).max(0.0);
        self.offset = offset.clamp(0.0, max_offset);
    }
}

/// A viewport over a laid-out snapshot.
#[derive(Debug, Clone, Copy)]
pub struct GridQuery<'a> {
    pub layout: &'a GridLayout,
    pub viewport: &'a Viewport,
    pub snapshot: &'a CollectionSnapshot,
}

impl GridQuery<'_> {
    pub fn visible_indices(&self) -> std::ops::Range<usize> {
        self.layout
            .indices_in_extent(self.viewport.visible_extent(), self.snapshot.len())
    }
}

impl ViewportQuery for GridQuery<'_> {
    fn visible_extent(&self) -> Extent {
        self.viewport.visible_extent()
    }

    fn items_in_extent(&self, extent: Extent) -> Vec<ItemId> {
        let range = self.layout.indices_in_extent(extent, self.snapshot.len());
        self.snapshot.slice(range).to_vec()
    }
}
