//! In-memory thumbnail cache implementing `ImageCachingService`.
//!
//! - Memory cache: LRU of rendered thumbnails keyed by `CacheKey`
//! - Preheat set: keys currently requested through `start_caching`
//! - Waiters: outstanding `request_thumbnail` calls per key
//!
//! Keys are an xxhash of (identifier + target size + content mode), so the
//! same asset cached at two sizes occupies two entries.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use xxhash_rust::xxh3::xxh3_64;

use super::generator::{Thumbnail, ThumbnailSource};
use super::queue::{RenderJob, RenderResult, ThumbnailQueue};
use crate::config::GridConfig;
use crate::error::CacheServiceError;
use crate::models::ItemId;
use crate::preheat::{
    ContentMode, ImageCachingService, ThumbnailDelivery, ThumbnailSpec, ThumbnailTicket,
};

/// Bump when thumbnail generation semantics change.
const THUMB_CACHE_VERSION: u8 = 1;

/// Cache key for thumbnail lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: u64,
}

impl CacheKey {
    pub fn new(id: &ItemId, spec: ThumbnailSpec) -> Self {
        let id = id.as_str().as_bytes();
        let mut data = Vec::with_capacity(id.len() + 10);
        data.push(THUMB_CACHE_VERSION);
        data.extend_from_slice(id);
        data.extend_from_slice(&spec.width.to_le_bytes());
        data.extend_from_slice(&spec.height.to_le_bytes());
        data.push(match spec.mode {
            ContentMode::AspectFill => 0,
            ContentMode::AspectFit => 1,
        });
        Self {
            hash: xxh3_64(&data),
        }
    }

    pub fn value(&self) -> u64 {
        self.hash
    }
}

/// Point-in-time counters for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub memory_bytes: usize,
    pub preheated: usize,
    pub pending: usize,
    pub waiting_requests: usize,
    pub queued_jobs: usize,
    pub active_workers: usize,
}

struct Waiter {
    id: ItemId,
    ticket: ThumbnailTicket,
}

struct CacheState {
    memory: LruCache<CacheKey, Arc<Thumbnail>>,
    preheated: HashSet<CacheKey>,
    pending: HashSet<CacheKey>,
    waiters: HashMap<CacheKey, Vec<Waiter>>,
    deliveries: Vec<ThumbnailDelivery>,
}

/// Thumbnail cache backed by a worker queue.
pub struct ThumbnailCache {
    queue: ThumbnailQueue,
    state: Mutex<CacheState>,
}

impl ThumbnailCache {
    pub fn new(
        source: Arc<dyn ThumbnailSource>,
        workers: usize,
        queue_size: usize,
        memory_entries: usize,
    ) -> Result<Self> {
        let queue = ThumbnailQueue::new(workers, queue_size, source)?;
        let capacity = NonZeroUsize::new(memory_entries).unwrap_or(NonZeroUsize::MIN);
        debug!(memory_entries = capacity.get(), "Initialized thumbnail cache");

        Ok(Self {
            queue,
            state: Mutex::new(CacheState {
                memory: LruCache::new(capacity),
                preheated: HashSet::new(),
                pending: HashSet::new(),
                waiters: HashMap::new(),
                deliveries: Vec::new(),
            }),
        })
    }

    pub fn from_config(source: Arc<dyn ThumbnailSource>, config: &GridConfig) -> Result<Self> {
        Self::new(
            source,
            config.worker_count(),
            config.thumbnails.queue_size,
            config.thumbnails.memory_entries,
        )
    }

    /// Returns a thumbnail from memory only.
    pub fn get(&self, id: &ItemId, spec: ThumbnailSpec) -> Option<Arc<Thumbnail>> {
        self.state.lock().memory.get(&CacheKey::new(id, spec)).cloned()
    }

    pub fn is_preheated(&self, id: &ItemId, spec: ThumbnailSpec) -> bool {
        self.state.lock().preheated.contains(&CacheKey::new(id, spec))
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            memory_entries: state.memory.len(),
            memory_bytes: state.memory.iter().map(|(_, t)| t.memory_bytes()).sum(),
            preheated: state.preheated.len(),
            pending: state.pending.len(),
            waiting_requests: state.waiters.values().map(Vec::len).sum(),
            queued_jobs: self.queue.queued_count(),
            active_workers: self.queue.active_worker_count(),
        }
    }

    /// Folds completed renders into the cache. Returns the number processed.
    pub fn pump(&self) -> usize {
        let results = self.queue.poll_results();
        let count = results.len();
        if count > 0 {
            let mut state = self.state.lock();
            for result in results {
                Self::complete(&mut state, result);
            }
        }
        count
    }

    /// Blocks until nothing is pending or `timeout` elapses between results.
    pub fn wait_idle(&self, timeout: Duration) -> usize {
        let mut count = self.pump();
        while !self.state.lock().pending.is_empty() {
            let Some(result) = self.queue.wait_result(timeout) else {
                break;
            };
            Self::complete(&mut self.state.lock(), result);
            count += 1 + self.pump();
        }
        count
    }

    fn submit(
        &self,
        state: &mut CacheState,
        id: &ItemId,
        key: CacheKey,
        spec: ThumbnailSpec,
    ) -> Result<(), CacheServiceError> {
        if state.pending.contains(&key) {
            return Ok(());
        }
        self.queue.submit(RenderJob {
            key,
            id: id.clone(),
            spec,
        })?;
        state.pending.insert(key);
        Ok(())
    }

    fn complete(state: &mut CacheState, result: RenderResult) {
        state.pending.remove(&result.key);
        let waiters = state.waiters.remove(&result.key).unwrap_or_default();

        let thumb = match result.outcome {
            Ok(thumb) => Arc::new(thumb),
            Err(source) => {
                let err = CacheServiceError::Render {
                    id: result.id,
                    source,
                };
                warn!(error = ?err, "Failed to generate thumbnail");
                return;
            }
        };

        if state.preheated.contains(&result.key) || !waiters.is_empty() {
            state.memory.put(result.key, Arc::clone(&thumb));
        } else {
            trace!(id = %result.id, "Dropping render for item no longer cached");
        }

        for waiter in waiters {
            state.deliveries.push(ThumbnailDelivery {
                id: waiter.id,
                ticket: waiter.ticket,
                image: Arc::clone(&thumb),
            });
        }
    }
}

impl ImageCachingService for ThumbnailCache {
    fn start_caching(
        &self,
        items: &[ItemId],
        spec: ThumbnailSpec,
    ) -> Result<(), CacheServiceError> {
        let mut state = self.state.lock();
        let mut first_error = None;
        for id in items {
            let key = CacheKey::new(id, spec);
            state.preheated.insert(key);
            if state.memory.contains(&key) {
                continue;
            }
            if let Err(e) = self.submit(&mut state, id, key, spec) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn stop_caching(&self, items: &[ItemId], spec: ThumbnailSpec) -> Result<(), CacheServiceError> {
        let mut state = self.state.lock();
        for id in items {
            let key = CacheKey::new(id, spec);
            state.preheated.remove(&key);
            state.memory.pop(&key);
        }
        Ok(())
    }

    fn stop_caching_all(&self) {
        let mut state = self.state.lock();
        state.preheated.clear();
        state.memory.clear();
        debug!("Cleared thumbnail cache");
    }

    fn request_thumbnail(
        &self,
        id: &ItemId,
        spec: ThumbnailSpec,
        ticket: ThumbnailTicket,
    ) -> Result<(), CacheServiceError> {
        let key = CacheKey::new(id, spec);
        let mut state = self.state.lock();

        if let Some(thumb) = state.memory.get(&key).cloned() {
            trace!(%id, "Memory cache hit");
            state.deliveries.push(ThumbnailDelivery {
                id: id.clone(),
                ticket,
                image: thumb,
            });
            return Ok(());
        }

        self.submit(&mut state, id, key, spec)?;
        state.waiters.entry(key).or_default().push(Waiter {
            id: id.clone(),
            ticket,
        });
        Ok(())
    }

    fn take_deliveries(&self) -> Vec<ThumbnailDelivery> {
        self.pump();
        std::mem::take(&mut self.state.lock().deliveries)
    }
}
