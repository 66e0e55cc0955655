//! Grid geometry.
//!
//! - `GridLayout` - fixed-column square-cell layout mapping scroll extents to
//!   index ranges
//! - `Viewport` - scroll offset and visible size
//! - `ViewportQuery` - the lookup the preheat window needs, implemented by
//!   `GridQuery`

pub mod grid;
pub mod viewport;

pub use grid::GridLayout;
pub use viewport::{GridQuery, Viewport, ViewportQuery};
