//! Single-writer apply context.
//!
//! One thread owns the state. Other threads reach it through a
//! [`MainHandle`]: `sync` blocks the caller until the job has run and returns
//! its result, `post` queues a job and returns immediately.

use std::thread::{self, JoinHandle, ThreadId};

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use tracing::{debug, warn};

use crate::error::ApplyError;

type Job<T> = Box<dyn FnOnce(&mut T) + Send>;

enum Message<T> {
    Run(Job<T>),
    Shutdown,
}

/// Owns the apply thread and the state it mutates.
pub struct MainContext<T> {
    handle: MainHandle<T>,
    thread: Option<JoinHandle<T>>,
}

/// Cloneable way into a [`MainContext`].
pub struct MainHandle<T> {
    tx: Sender<Message<T>>,
    thread_id: ThreadId,
}

impl<T> Clone for MainHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            thread_id: self.thread_id,
        }
    }
}

impl<T: Send + 'static> MainContext<T> {
    /// Moves `state` onto a new thread named `name`.
    pub fn spawn(name: &str, state: T) -> Result<Self> {
        let (tx, rx) = flume::unbounded();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(state, rx))
            .with_context(|| format!("Failed to spawn apply context {name}"))?;
        debug!(name, "Apply context started");

        Ok(Self {
            handle: MainHandle {
                tx,
                thread_id: thread.thread().id(),
            },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> MainHandle<T> {
        self.handle.clone()
    }

    /// Runs the jobs already queued, stops the thread and hands the state
    /// back. Handles still held elsewhere start failing with
    /// [`ApplyError::Closed`].
    pub fn shutdown(mut self) -> Result<T, ApplyError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<T, ApplyError> {
        let thread = self.thread.take().ok_or(ApplyError::Closed)?;
        let _ = self.handle.tx.send(Message::Shutdown);
        thread.join().map_err(|_| {
            warn!("Apply context panicked");
            ApplyError::Closed
        })
    }
}

impl<T> Drop for MainContext<T> {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.tx.send(Message::Shutdown);
            let _ = thread.join();
        }
    }
}

impl<T: 'static> MainHandle<T> {
    /// Whether the caller is running on the apply thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Runs `f` on the apply thread and waits for its result.
    ///
    /// Calling this from the apply thread itself would deadlock and is
    /// rejected with [`ApplyError::Reentrant`].
    pub fn sync<R, F>(&self, f: F) -> Result<R, ApplyError>
    where
        R: Send + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
    {
        if self.is_current() {
            return Err(ApplyError::Reentrant);
        }
        let (reply_tx, reply_rx) = flume::bounded(1);
        let job: Job<T> = Box::new(move |state| {
            let _ = reply_tx.send(f(state));
        });
        self.tx
            .send(Message::Run(job))
            .map_err(|_| ApplyError::Closed)?;
        reply_rx.recv().map_err(|_| ApplyError::Closed)
    }
}

fn run<T>(mut state: T, rx: Receiver<Message<T>>) -> T {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(job) => job(&mut state),
            Message::Shutdown => break,
        }
    }
    debug!("Apply context stopped");
    state
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_sync_returns_result_and_mutates_state() {
        let context = MainContext::spawn("test-apply", 0u32).unwrap();
        let handle = context.handle();

        assert_eq!(handle.sync(|n| {
            *n += 5;
            *n
        }), Ok(5));
        assert_eq!(context.shutdown(), Ok(5));
    }

    #[test]
    fn test_sync_calls_run_in_order() {
        let context = MainContext::spawn("test-apply", Vec::new()).unwrap();
        let handle = context.handle();

        handle.sync(|v: &mut Vec<u32>| v.push(1)).unwrap();
        handle.sync(|v: &mut Vec<u32>| v.push(2)).unwrap();
        assert_eq!(context.shutdown(), Ok(vec![1, 2]));
    }

    #[test]
    fn test_sync_from_apply_thread_is_rejected() {
        let context = MainContext::spawn("test-apply", ()).unwrap();
        let handle = context.handle();
        let inner = handle.clone();
        let outcome = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&outcome);

        handle
            .sync(move |_| {
                *seen.lock() = Some(inner.sync(|_| ()));
            })
            .unwrap();
        assert_eq!(*outcome.lock(), Some(Err(ApplyError::Reentrant)));
    }

    #[test]
    fn test_handle_fails_after_shutdown() {
        let context = MainContext::spawn("test-apply", ()).unwrap();
        let handle = context.handle();
        context.shutdown().unwrap();

        assert_eq!(handle.sync(|_| ()), Err(ApplyError::Closed));
    }
}
