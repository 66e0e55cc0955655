use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::{ImageCachingService, PreheatUpdate, PreheatWindowCalculator, ThumbnailSpec};
use crate::geometry::Extent;
use crate::models::ItemId;

/// Drives the caching service from preheat window changes.
///
/// Owns the window calculator so that a cache reset and a window reset
/// always happen together. Service failures are logged and otherwise
/// ignored: caching is best effort.
pub struct AssetCacheController<S: ?Sized> {
    service: Arc<S>,
    window: PreheatWindowCalculator,
    spec: ThumbnailSpec,
}

impl<S: ImageCachingService + ?Sized> AssetCacheController<S> {
    pub fn new(service: Arc<S>, window: PreheatWindowCalculator, spec: ThumbnailSpec) -> Self {
        Self {
            service,
            window,
            spec,
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn window(&self) -> &PreheatWindowCalculator {
        &self.window
    }

    pub fn spec(&self) -> ThumbnailSpec {
        self.spec
    }

    /// Changes the target size. Anything cached at the old size is useless,
    /// so a changed spec resets caching.
    pub fn set_spec(&mut self, spec: ThumbnailSpec) {
        if spec != self.spec {
            debug!(?spec, "Thumbnail spec changed");
            self.spec = spec;
            self.reset_all();
        }
    }

    /// Moves the preheat window and forwards the resulting start/stop lists.
    pub fn update_window<F>(
        &mut self,
        visible: Extent,
        viewport_length: f64,
        items_in_extent: F,
    ) -> PreheatUpdate
    where
        F: FnMut(Extent) -> Vec<ItemId>,
    {
        let update = self.window.update(visible, viewport_length, items_in_extent);
        self.on_window_updated(&update);
        update
    }

    pub fn on_window_updated(&self, update: &PreheatUpdate) {
        if !update.to_start.is_empty() {
            trace!(count = update.to_start.len(), "Start caching");
            if let Err(e) = self.service.start_caching(&update.to_start, self.spec) {
                warn!(error = %e, "Failed to start caching thumbnails");
            }
        }
        if !update.to_stop.is_empty() {
            trace!(count = update.to_stop.len(), "Stop caching");
            if let Err(e) = self.service.stop_caching(&update.to_stop, self.spec) {
                warn!(error = %e, "Failed to stop caching thumbnails");
            }
        }
    }

    /// Stops all caching, then forgets the preheated window.
    pub fn reset_all(&mut self) {
        self.service.stop_caching_all();
        self.window.reset();
        debug!("Reset cached assets");
    }
}
