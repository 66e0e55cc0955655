use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::models::ChangeDescription;

/// Receives change descriptions from a notification source.
pub trait ChangeObserver: Send + Sync {
    fn library_did_change(&self, change: &ChangeDescription);
}

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe source of change descriptions.
pub trait ChangeNotificationSource: Send + Sync {
    fn subscribe(&self, observer: Arc<dyn ChangeObserver>) -> SubscriptionId;

    /// Returns false if `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// In-process notification source.
///
/// Owned by whoever publishes; there is no process-wide instance. Observers
/// are called on the publishing thread in subscription order, outside the
/// registry lock, so an observer may unsubscribe itself.
#[derive(Default)]
pub struct ChangeHub {
    next_id: AtomicU64,
    observers: RwLock<BTreeMap<SubscriptionId, Arc<dyn ChangeObserver>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn publish(&self, change: &ChangeDescription) {
        // Copy observers so callbacks run outside the lock.
        let observers: Vec<Arc<dyn ChangeObserver>> =
            self.observers.read().values().cloned().collect();
        trace!(
            observers = observers.len(),
            generation = change.resulting.generation(),
            "Publishing change"
        );
        for observer in observers {
            observer.library_did_change(change);
        }
    }
}

impl ChangeNotificationSource for ChangeHub {
    fn subscribe(&self, observer: Arc<dyn ChangeObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().insert(id, observer);
        debug!(?id, "Observer subscribed");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.observers.write().remove(&id).is_some();
        if removed {
            debug!(?id, "Observer unsubscribed");
        }
        removed
    }
}
