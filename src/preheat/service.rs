use std::sync::Arc;

use serde::Deserialize;

use crate::error::CacheServiceError;
use crate::models::ItemId;
use crate::thumbnails::Thumbnail;

/// How a source image is scaled into the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Cover the target, cropping the overflow.
    AspectFill,
    /// Fit inside the target, preserving the whole image.
    AspectFit,
}

/// Target thumbnail size in device pixels plus fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailSpec {
    pub width: u32,
    pub height: u32,
    pub mode: ContentMode,
}

impl ThumbnailSpec {
    pub fn new(width: u32, height: u32, mode: ContentMode) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            mode,
        }
    }

    /// Spec for a square cell of `cell_size` points at `scale` pixels per point.
    pub fn for_cell(cell_size: f64, scale: f64, mode: ContentMode) -> Self {
        let px = (cell_size * scale).round().max(1.0) as u32;
        Self::new(px, px, mode)
    }
}

/// Identity stamp carried by a thumbnail request: the slot that asked, and
/// the binding token the slot held at the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailTicket {
    pub slot: usize,
    pub token: u64,
}

/// A completed thumbnail request.
#[derive(Debug, Clone)]
pub struct ThumbnailDelivery {
    pub id: ItemId,
    pub ticket: ThumbnailTicket,
    pub image: Arc<Thumbnail>,
}

/// The external image caching collaborator.
///
/// Start and stop are idempotent: starting an already cached item or
/// stopping one that is not cached is a no-op. Implementations coalesce
/// duplicate requests themselves.
pub trait ImageCachingService: Send + Sync {
    fn start_caching(&self, items: &[ItemId], spec: ThumbnailSpec)
        -> Result<(), CacheServiceError>;

    fn stop_caching(&self, items: &[ItemId], spec: ThumbnailSpec) -> Result<(), CacheServiceError>;

    fn stop_caching_all(&self);

    /// Asks for a thumbnail; the result eventually shows up in
    /// [`take_deliveries`](Self::take_deliveries), possibly out of order.
    fn request_thumbnail(
        &self,
        id: &ItemId,
        spec: ThumbnailSpec,
        ticket: ThumbnailTicket,
    ) -> Result<(), CacheServiceError>;

    /// Drains deliveries completed since the last call.
    fn take_deliveries(&self) -> Vec<ThumbnailDelivery>;
}
