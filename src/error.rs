//! Error types for thumbgrid.
//!
//! - [`ReconcileError`] - the change source broke its contract; fatal to the
//!   reconciliation attempt and surfaced to the caller.
//! - [`CacheServiceError`] - the caching collaborator failed; caching is best
//!   effort, so these are logged and never affect reconciliation.
//! - [`ApplyError`] - the single-writer apply context could not run a job.
//!
//! Stale thumbnail deliveries are not errors at all: they are dropped.

use thiserror::Error;

use crate::models::ItemId;

/// A change description that cannot be applied to the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("change is based on generation {found}, current snapshot is generation {expected}")]
    GenerationMismatch { expected: u64, found: u64 },

    #[error("removed index {index} out of bounds for prior snapshot of {len} items")]
    RemovedOutOfBounds { index: usize, len: usize },

    #[error("inserted index {index} out of bounds for resulting snapshot of {len} items")]
    InsertedOutOfBounds { index: usize, len: usize },

    #[error("changed index {index} out of bounds for prior snapshot of {len} items")]
    ChangedOutOfBounds { index: usize, len: usize },

    #[error("changed index {index} is also listed as removed")]
    ChangedAndRemoved { index: usize },

    #[error("move {from} -> {to} out of bounds for arrangement of {len} items")]
    MoveOutOfBounds { from: usize, to: usize, len: usize },

    #[error("index {index} appears more than once as a move {side}")]
    DuplicateMove { index: usize, side: &'static str },

    #[error(
        "prior count {prior} - {removed} removed + {inserted} inserted != resulting count {resulting}"
    )]
    CountMismatch {
        prior: usize,
        removed: usize,
        inserted: usize,
        resulting: usize,
    },

    #[error("view diverged from resulting snapshot at index {index}")]
    ViewDiverged { index: usize },
}

/// Failure reported by an image caching service.
#[derive(Debug, Error)]
pub enum CacheServiceError {
    #[error("thumbnail queue full, dropped request for {0}")]
    QueueFull(ItemId),

    #[error("thumbnail workers disconnected")]
    Disconnected,

    #[error("failed to render thumbnail for {id}")]
    Render {
        id: ItemId,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure to hand a job to the apply context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("apply context has shut down")]
    Closed,

    #[error("blocking hand-off issued from the apply context itself")]
    Reentrant,
}
