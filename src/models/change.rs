use std::collections::{BTreeSet, HashMap, HashSet};

use super::{CollectionSnapshot, ItemId};

/// Relocation of one element; both indices refer to the arrangement reached
/// after deletes, inserts and reloads have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMove {
    pub from: usize,
    pub to: usize,
}

impl IndexMove {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// Index-level description of a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexChanges {
    /// Indices into the prior snapshot.
    pub removed: BTreeSet<usize>,
    /// Indices into the resulting snapshot.
    pub inserted: BTreeSet<usize>,
    /// Indices into the prior snapshot whose content changed in place.
    pub changed: BTreeSet<usize>,
    pub moves: Vec<IndexMove>,
}

impl IndexChanges {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.inserted.is_empty()
            && self.changed.is_empty()
            && self.moves.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDetails {
    Incremental(IndexChanges),
    /// The source could not express the change as index operations.
    Wholesale,
}

/// A change delivered by the notification source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescription {
    /// Generation of the snapshot the change was computed against.
    pub base_generation: u64,
    pub details: ChangeDetails,
    pub resulting: CollectionSnapshot,
}

impl ChangeDescription {
    pub fn incremental(
        base: &CollectionSnapshot,
        changes: IndexChanges,
        resulting: CollectionSnapshot,
    ) -> Self {
        Self {
            base_generation: base.generation(),
            details: ChangeDetails::Incremental(changes),
            resulting,
        }
    }

    pub fn wholesale(base: &CollectionSnapshot, resulting: CollectionSnapshot) -> Self {
        Self {
            base_generation: base.generation(),
            details: ChangeDetails::Wholesale,
            resulting,
        }
    }

    pub fn has_incremental_changes(&self) -> bool {
        matches!(self.details, ChangeDetails::Incremental(_))
    }

    /// Derives the incremental description that turns `old` into `new`.
    ///
    /// `updated` names items whose content was edited; only those that
    /// survive into `new` are reported as changed. Moves are emitted for every
    /// survivor that does not already sit at its final position once deletes
    /// and inserts are applied, so applying them as a simultaneous permutation
    /// always lands on `new`.
    pub fn between(
        old: &CollectionSnapshot,
        new: CollectionSnapshot,
        updated: &HashSet<ItemId>,
    ) -> Self {
        let new_positions: HashMap<&ItemId, usize> =
            new.iter().enumerate().map(|(i, id)| (id, i)).collect();
        let old_ids: HashSet<&ItemId> = old.iter().collect();

        let mut changes = IndexChanges::default();
        let mut survivors = Vec::with_capacity(old.len());
        for (i, id) in old.iter().enumerate() {
            if new_positions.contains_key(id) {
                survivors.push(id);
                if updated.contains(id) {
                    changes.changed.insert(i);
                }
            } else {
                changes.removed.insert(i);
            }
        }

        for (j, id) in new.iter().enumerate() {
            if !old_ids.contains(id) {
                changes.inserted.insert(j);
            }
        }

        // Survivors keep their relative order and fill every slot that is
        // not an insertion.
        let mut survivors = survivors.into_iter();
        for position in 0..new.len() {
            if changes.inserted.contains(&position) {
                continue;
            }
            let Some(id) = survivors.next() else { break };
            let target = new_positions[id];
            if target != position {
                changes.moves.push(IndexMove::new(position, target));
            }
        }

        Self::incremental(old, changes, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<ItemId> {
        list.iter().map(|id| ItemId::from(*id)).collect()
    }

    fn changes_of(change: &ChangeDescription) -> &IndexChanges {
        match &change.details {
            ChangeDetails::Incremental(changes) => changes,
            ChangeDetails::Wholesale => panic!("expected incremental change"),
        }
    }

    #[test]
    fn test_between_detects_insert_and_remove() {
        let old = CollectionSnapshot::new(1, ids(&["a", "b", "c"]));
        let new = CollectionSnapshot::new(2, ids(&["x", "a", "c"]));
        let change = ChangeDescription::between(&old, new, &HashSet::new());
        let changes = changes_of(&change);

        assert_eq!(change.base_generation, 1);
        assert_eq!(changes.removed, BTreeSet::from([1]));
        assert_eq!(changes.inserted, BTreeSet::from([0]));
        assert!(changes.moves.is_empty());
    }

    #[test]
    fn test_between_reports_only_surviving_updates() {
        let old = CollectionSnapshot::new(1, ids(&["a", "b"]));
        let new = CollectionSnapshot::new(2, ids(&["a"]));
        let updated = HashSet::from([ItemId::from("a"), ItemId::from("b")]);
        let change = ChangeDescription::between(&old, new, &updated);

        assert_eq!(changes_of(&change).changed, BTreeSet::from([0]));
    }

    #[test]
    fn test_between_swap_emits_two_moves() {
        let old = CollectionSnapshot::new(1, ids(&["a", "b", "c"]));
        let new = CollectionSnapshot::new(2, ids(&["c", "b", "a"]));
        let change = ChangeDescription::between(&old, new, &HashSet::new());

        assert_eq!(
            changes_of(&change).moves,
            vec![IndexMove::new(0, 2), IndexMove::new(2, 0)]
        );
    }

    #[test]
    fn test_between_identical_is_empty() {
        let old = CollectionSnapshot::new(1, ids(&["a", "b"]));
        let new = CollectionSnapshot::new(2, ids(&["a", "b"]));
        let change = ChangeDescription::between(&old, new, &HashSet::new());
        assert!(changes_of(&change).is_empty());
    }
}
