//! Thumbnail worker queue for async generation.
//!
//! - Bounded worker pool (1-4 threads) for thumbnail generation
//! - Requests go out over a bounded flume channel; a full queue rejects
//!   the request instead of blocking the apply context
//! - Results come back unordered on an unbounded channel and are drained by
//!   the owner with `poll_results`

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use tracing::{debug, trace, warn};

use super::cache::CacheKey;
use super::generator::{Thumbnail, ThumbnailGenerator, ThumbnailSource};
use crate::error::CacheServiceError;
use crate::models::ItemId;
use crate::preheat::ThumbnailSpec;

/// How long an idle worker waits before rechecking the shutdown flag.
const WORKER_POLL_MS: u64 = 100;

/// A request to generate one thumbnail.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub key: CacheKey,
    pub id: ItemId,
    pub spec: ThumbnailSpec,
}

/// Result of thumbnail generation sent back to the owner.
#[derive(Debug)]
pub struct RenderResult {
    pub key: CacheKey,
    pub id: ItemId,
    pub outcome: Result<Thumbnail>,
}

/// Worker queue for thumbnail generation.
pub struct ThumbnailQueue {
    request_tx: Sender<RenderJob>,
    result_rx: Receiver<RenderResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    active_workers: Arc<AtomicUsize>,
}

impl ThumbnailQueue {
    /// Starts `workers` threads rendering from `source`.
    pub fn new(
        workers: usize,
        queue_size: usize,
        source: Arc<dyn ThumbnailSource>,
    ) -> Result<Self> {
        let (request_tx, request_rx) = flume::bounded(queue_size.max(1));
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let active_workers = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers.max(1) {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let active = Arc::clone(&active_workers);
            let source = Arc::clone(&source);

            let handle = thread::Builder::new()
                .name(format!("thumb-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, rx, tx, shutdown, active, source))
                .context("Failed to spawn thumbnail worker")?;
            handles.push(handle);
        }

        debug!(num_workers = handles.len(), "Started thumbnail worker queue");

        Ok(Self {
            request_tx,
            result_rx,
            workers: handles,
            shutdown,
            active_workers,
        })
    }

    /// Submits a job without blocking.
    pub fn submit(&self, job: RenderJob) -> Result<(), CacheServiceError> {
        match self.request_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(job)) => Err(CacheServiceError::QueueFull(job.id)),
            Err(flume::TrySendError::Disconnected(_)) => Err(CacheServiceError::Disconnected),
        }
    }

    /// Drains completed results (non-blocking).
    pub fn poll_results(&self) -> Vec<RenderResult> {
        self.result_rx.try_iter().collect()
    }

    /// Waits up to `timeout` for the next result.
    pub fn wait_result(&self, timeout: Duration) -> Option<RenderResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }

    /// Number of jobs waiting for a worker.
    pub fn queued_count(&self) -> usize {
        self.request_tx.len()
    }

    pub fn active_worker_count(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn shutdown(&mut self) {
        debug!("Shutting down thumbnail queue");
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("Thumbnail queue shutdown complete");
    }
}

impl Drop for ThumbnailQueue {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<RenderJob>,
    tx: Sender<RenderResult>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    source: Arc<dyn ThumbnailSource>,
) {
    debug!(worker_id, "Thumbnail worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(Duration::from_millis(WORKER_POLL_MS)) {
            Ok(job) => {
                active.fetch_add(1, Ordering::Relaxed);
                trace!(worker_id, id = %job.id, "Rendering thumbnail");

                let outcome = ThumbnailGenerator::generate(source.as_ref(), &job.id, job.spec);
                let result = RenderResult {
                    key: job.key,
                    id: job.id,
                    outcome,
                };
                if let Err(e) = tx.send(result) {
                    warn!(worker_id, error = ?e, "Failed to send thumbnail result");
                }

                active.fetch_sub(1, Ordering::Relaxed);
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Thumbnail worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preheat::ContentMode;
    use image::DynamicImage;

    struct Gray;

    impl ThumbnailSource for Gray {
        fn load(&self, _id: &ItemId) -> Result<DynamicImage> {
            Ok(DynamicImage::new_rgba8(32, 32))
        }
    }

    fn job(id: &str) -> RenderJob {
        let spec = ThumbnailSpec::new(8, 8, ContentMode::AspectFill);
        let id = ItemId::from(id);
        RenderJob {
            key: CacheKey::new(&id, spec),
            id,
            spec,
        }
    }

    #[test]
    fn test_submit_and_receive() {
        let queue = ThumbnailQueue::new(2, 16, Arc::new(Gray)).unwrap();
        queue.submit(job("a")).unwrap();

        let result = queue.wait_result(Duration::from_secs(5)).unwrap();
        assert_eq!(result.id, ItemId::from("a"));
        let thumb = result.outcome.unwrap();
        assert_eq!((thumb.width, thumb.height), (8, 8));
    }

    #[test]
    fn test_worker_count_minimum_one() {
        let queue = ThumbnailQueue::new(0, 4, Arc::new(Gray)).unwrap();
        assert_eq!(queue.worker_count(), 1);
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut queue = ThumbnailQueue::new(2, 4, Arc::new(Gray)).unwrap();
        queue.shutdown();
        assert_eq!(queue.worker_count(), 0);
    }
}
