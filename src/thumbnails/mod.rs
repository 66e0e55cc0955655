//! Thumbnail pipeline backing the preheat controller.
//!
//! This module provides:
//! - `ThumbnailGenerator` - Scales source images to a `ThumbnailSpec`
//! - `ThumbnailCache` - LRU memory cache implementing `ImageCachingService`
//! - `ThumbnailQueue` - Worker queue for async generation
//! - `SlotBinder` - Per-slot identity tokens guarding late deliveries

pub mod cache;
pub mod generator;
pub mod queue;
pub mod slots;

pub use cache::{CacheKey, CacheStats, ThumbnailCache};
pub use generator::{Thumbnail, ThumbnailGenerator, ThumbnailSource};
pub use queue::{RenderJob, RenderResult, ThumbnailQueue};
pub use slots::{DeliveryOutcome, SlotBinder};
