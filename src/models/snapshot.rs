use std::ops::{Index, Range};
use std::sync::Arc;

use super::ItemId;

/// Ordered, index-addressable view of the collection at one point in time.
///
/// Snapshots are immutable and cheap to clone; readers hold their own copy
/// while the reconciler swaps in the next generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSnapshot {
    generation: u64,
    items: Arc<[ItemId]>,
}

impl CollectionSnapshot {
    pub fn new(generation: u64, items: Vec<ItemId>) -> Self {
        Self {
            generation,
            items: items.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    /// Generation stamp; change descriptions name the generation they apply to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ItemId> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter()
    }

    /// Identifiers for `range`, clamped to the snapshot bounds.
    pub fn slice(&self, range: Range<usize>) -> &[ItemId] {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        &self.items[start..end]
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| item == id)
    }
}

impl Default for CollectionSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Index<usize> for CollectionSnapshot {
    type Output = ItemId;

    fn index(&self, index: usize) -> &ItemId {
        &self.items[index]
    }
}
