//! The grid itself and the session that runs it.
//!
//! - `AssetGrid` - layout, preheating, reconciliation and slot binding
//! - `GridSession` - apply context plus change subscription lifecycle

pub mod asset_grid;
pub mod session;

pub use asset_grid::AssetGrid;
pub use session::GridSession;
