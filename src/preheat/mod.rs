//! Viewport-driven thumbnail preheating.
//!
//! - `PreheatWindowCalculator` - tracks the preheated extent and decides when
//!   a scroll moved far enough to recompute it
//! - `AssetCacheController` - forwards window changes to the caching service
//! - `ImageCachingService` - the caching collaborator's interface

pub mod controller;
pub mod service;
pub mod window;

pub use controller::*;
pub use service::*;
pub use window::*;
