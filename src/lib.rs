//! Viewport-driven thumbnail preheating and incremental change
//! reconciliation for a scrolling media grid.

pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod layout;
pub mod library;
pub mod logging;
pub mod models;
pub mod notify;
pub mod preheat;
pub mod reconcile;
pub mod testing;
pub mod thumbnails;

pub use config::GridConfig;
pub use error::{ApplyError, CacheServiceError, ReconcileError};
pub use grid::{AssetGrid, GridSession};
pub use library::MediaLibrary;
