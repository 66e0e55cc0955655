//! Identity-stamped display slots.
//!
//! Cells are reused while thumbnail requests are in flight. Every bind hands
//! out a fresh token; a delivery is applied only if the slot still holds that
//! token *and* is still bound to the identifier the request was issued for.
//! Anything else is a stale result and is dropped silently.

use std::sync::Arc;

use tracing::trace;

use super::generator::Thumbnail;
use crate::models::ItemId;
use crate::preheat::{ThumbnailDelivery, ThumbnailTicket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Applied,
    Stale,
}

#[derive(Debug, Default, Clone)]
struct Slot {
    bound: Option<ItemId>,
    token: u64,
    image: Option<Arc<Thumbnail>>,
}

#[derive(Debug)]
pub struct SlotBinder {
    slots: Vec<Slot>,
    next_token: u64,
}

impl SlotBinder {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![Slot::default(); count],
            next_token: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Grows or shrinks the pool. Slots that survive keep their binding.
    pub fn resize(&mut self, count: usize) {
        self.slots.resize_with(count, Slot::default);
    }

    /// Binds `slot` to `id`, clearing any image it showed. The returned
    /// ticket must accompany the thumbnail request for this binding.
    pub fn bind(&mut self, slot: usize, id: ItemId) -> ThumbnailTicket {
        let token = self.next_token;
        self.next_token += 1;

        let entry = &mut self.slots[slot];
        entry.bound = Some(id);
        entry.token = token;
        entry.image = None;
        ThumbnailTicket { slot, token }
    }

    /// Resets `slot` to the placeholder state.
    pub fn unbind(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Slot::default();
        }
    }

    pub fn unbind_all(&mut self) {
        for entry in &mut self.slots {
            *entry = Slot::default();
        }
    }

    pub fn bound_id(&self, slot: usize) -> Option<&ItemId> {
        self.slots.get(slot)?.bound.as_ref()
    }

    pub fn image(&self, slot: usize) -> Option<&Arc<Thumbnail>> {
        self.slots.get(slot)?.image.as_ref()
    }

    /// Applies `delivery` if its slot is still bound the way it was when the
    /// request went out.
    pub fn accept(&mut self, delivery: ThumbnailDelivery) -> DeliveryOutcome {
        let Some(entry) = self.slots.get_mut(delivery.ticket.slot) else {
            return DeliveryOutcome::Stale;
        };
        if entry.token != delivery.ticket.token || entry.bound.as_ref() != Some(&delivery.id) {
            trace!(
                slot = delivery.ticket.slot,
                id = %delivery.id,
                "Dropping stale thumbnail"
            );
            return DeliveryOutcome::Stale;
        }
        entry.image = Some(delivery.image);
        DeliveryOutcome::Applied
    }
}
