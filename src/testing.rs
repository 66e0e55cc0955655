//! Test doubles for the caching collaborator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::CacheServiceError;
use crate::models::ItemId;
use crate::preheat::{ImageCachingService, ThumbnailDelivery, ThumbnailSpec, ThumbnailTicket};
use crate::thumbnails::Thumbnail;

/// One call made against a [`RecordingCacheService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCall {
    Start(Vec<ItemId>),
    Stop(Vec<ItemId>),
    StopAll,
    Request(ItemId, ThumbnailTicket),
}

/// Records every call and holds thumbnail requests until the test completes
/// them, in whatever order it likes.
#[derive(Debug, Default)]
pub struct RecordingCacheService {
    calls: Mutex<Vec<CacheCall>>,
    outstanding: Mutex<Vec<(ItemId, ThumbnailTicket)>>,
    deliveries: Mutex<Vec<ThumbnailDelivery>>,
    failing: AtomicBool,
}

impl RecordingCacheService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Makes start/stop report failure (the calls are still recorded).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Items passed to `start_caching` since the last `clear_calls`.
    pub fn started(&self) -> Vec<ItemId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CacheCall::Start(items) => Some(items.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn outstanding(&self) -> Vec<(ItemId, ThumbnailTicket)> {
        self.outstanding.lock().clone()
    }

    /// Completes every outstanding request for `id`.
    pub fn complete(&self, id: &ItemId) -> usize {
        let mut outstanding = self.outstanding.lock();
        let mut deliveries = self.deliveries.lock();
        let before = outstanding.len();
        outstanding.retain(|(pending, ticket)| {
            if pending == id {
                deliveries.push(ThumbnailDelivery {
                    id: pending.clone(),
                    ticket: *ticket,
                    image: Arc::new(Thumbnail::solid(2, 2, [0x80, 0x80, 0x80])),
                });
                false
            } else {
                true
            }
        });
        before - outstanding.len()
    }

    /// Completes all outstanding requests, newest first.
    pub fn complete_all_reversed(&self) -> usize {
        let ids: Vec<ItemId> = self
            .outstanding
            .lock()
            .iter()
            .rev()
            .map(|(id, _)| id.clone())
            .collect();
        ids.iter().map(|id| self.complete(id)).sum()
    }

    fn check(&self) -> Result<(), CacheServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheServiceError::Disconnected)
        } else {
            Ok(())
        }
    }
}

impl ImageCachingService for RecordingCacheService {
    fn start_caching(&self, items: &[ItemId], _spec: ThumbnailSpec) -> Result<(), CacheServiceError> {
        self.calls.lock().push(CacheCall::Start(items.to_vec()));
        self.check()
    }

    fn stop_caching(&self, items: &[ItemId], _spec: ThumbnailSpec) -> Result<(), CacheServiceError> {
        self.calls.lock().push(CacheCall::Stop(items.to_vec()));
        self.check()
    }

    fn stop_caching_all(&self) {
        self.calls.lock().push(CacheCall::StopAll);
    }

    fn request_thumbnail(
        &self,
        id: &ItemId,
        _spec: ThumbnailSpec,
        ticket: ThumbnailTicket,
    ) -> Result<(), CacheServiceError> {
        self.calls.lock().push(CacheCall::Request(id.clone(), ticket));
        self.outstanding.lock().push((id.clone(), ticket));
        Ok(())
    }

    fn take_deliveries(&self) -> Vec<ThumbnailDelivery> {
        std::mem::take(&mut *self.deliveries.lock())
    }
}
