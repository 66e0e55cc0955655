use std::collections::HashSet;

use tracing::{debug, trace};

use super::plan::{IncrementalPlan, UpdatePlan};
use crate::error::ReconcileError;
use crate::models::{ChangeDescription, ChangeDetails, CollectionSnapshot, IndexChanges};

/// Holds the current snapshot and turns change descriptions into plans.
///
/// The reconciler is the only writer of the current snapshot. A successful
/// `apply` swaps in the resulting snapshot before it returns, so anything
/// reacting to the plan already sees the post-change state. A rejected change
/// leaves the current snapshot untouched.
#[derive(Debug, Clone, Default)]
pub struct ChangeReconciler {
    current: CollectionSnapshot,
}

impl ChangeReconciler {
    pub fn new(initial: CollectionSnapshot) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &CollectionSnapshot {
        &self.current
    }

    /// Whether `change` was computed against the current snapshot.
    pub fn concerns(&self, change: &ChangeDescription) -> bool {
        change.base_generation == self.current.generation()
    }

    /// Adopts `snapshot` as current without a plan. Used to recover after a
    /// missed change, when only a full reload can bring a view up to date.
    pub fn resync(&mut self, snapshot: CollectionSnapshot) {
        debug!(
            from = self.current.generation(),
            to = snapshot.generation(),
            "Resynchronized snapshot"
        );
        self.current = snapshot;
    }

    pub fn apply(&mut self, change: ChangeDescription) -> Result<UpdatePlan, ReconcileError> {
        if !self.concerns(&change) {
            return Err(ReconcileError::GenerationMismatch {
                expected: self.current.generation(),
                found: change.base_generation,
            });
        }

        let plan = match change.details {
            ChangeDetails::Wholesale => UpdatePlan::Wholesale,
            ChangeDetails::Incremental(changes) => {
                validate(&changes, self.current.len(), change.resulting.len())?;
                UpdatePlan::Incremental(IncrementalPlan {
                    deletes: changes.removed,
                    inserts: changes.inserted,
                    reloads: changes.changed,
                    moves: changes.moves,
                })
            }
        };

        debug!(
            from = self.current.generation(),
            to = change.resulting.generation(),
            wholesale = plan.is_wholesale(),
            "Reconciled change"
        );
        self.current = change.resulting;
        Ok(plan)
    }
}

fn validate(changes: &IndexChanges, prior: usize, resulting: usize) -> Result<(), ReconcileError> {
    if let Some(&index) = changes.removed.iter().find(|&&i| i >= prior) {
        return Err(ReconcileError::RemovedOutOfBounds { index, len: prior });
    }
    if let Some(&index) = changes.inserted.iter().find(|&&i| i >= resulting) {
        return Err(ReconcileError::InsertedOutOfBounds {
            index,
            len: resulting,
        });
    }
    for &index in &changes.changed {
        if index >= prior {
            return Err(ReconcileError::ChangedOutOfBounds { index, len: prior });
        }
        if changes.removed.contains(&index) {
            return Err(ReconcileError::ChangedAndRemoved { index });
        }
    }

    let removed = changes.removed.len();
    let inserted = changes.inserted.len();
    if prior - removed + inserted != resulting {
        return Err(ReconcileError::CountMismatch {
            prior,
            removed,
            inserted,
            resulting,
        });
    }

    let mut froms = HashSet::with_capacity(changes.moves.len());
    let mut tos = HashSet::with_capacity(changes.moves.len());
    for mv in &changes.moves {
        if mv.from >= resulting || mv.to >= resulting {
            return Err(ReconcileError::MoveOutOfBounds {
                from: mv.from,
                to: mv.to,
                len: resulting,
            });
        }
        if !froms.insert(mv.from) {
            return Err(ReconcileError::DuplicateMove {
                index: mv.from,
                side: "source",
            });
        }
        if !tos.insert(mv.to) {
            return Err(ReconcileError::DuplicateMove {
                index: mv.to,
                side: "target",
            });
        }
    }

    trace!(
        removed,
        inserted,
        changed = changes.changed.len(),
        moves = changes.moves.len(),
        "Validated incremental change"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::{IndexMove, ItemId};

    fn snapshot(generation: u64, ids: &[&str]) -> CollectionSnapshot {
        CollectionSnapshot::new(generation, ids.iter().map(|id| ItemId::from(*id)).collect())
    }

    fn five() -> ChangeReconciler {
        ChangeReconciler::new(snapshot(1, &["a", "b", "c", "d", "e"]))
    }

    fn ordering_example(reconciler: &ChangeReconciler) -> ChangeDescription {
        ChangeDescription::incremental(
            reconciler.current(),
            IndexChanges {
                removed: BTreeSet::from([2]),
                inserted: BTreeSet::from([0]),
                changed: BTreeSet::from([4]),
                moves: vec![IndexMove::new(1, 3)],
            },
            snapshot(2, &["x", "b", "d", "a", "e"]),
        )
    }

    #[test]
    fn test_incremental_plan_and_snapshot_swap() {
        let mut reconciler = five();
        let change = ordering_example(&reconciler);
        let resulting = change.resulting.clone();

        let plan = reconciler.apply(change).unwrap();
        let UpdatePlan::Incremental(plan) = plan else {
            panic!("expected incremental plan");
        };
        assert_eq!(plan.deletes, BTreeSet::from([2]));
        assert_eq!(plan.inserts, BTreeSet::from([0]));
        assert_eq!(plan.reloads, BTreeSet::from([4]));
        assert_eq!(plan.moves, vec![IndexMove::new(1, 3)]);
        assert_eq!(reconciler.current(), &resulting);
    }

    #[test]
    fn test_wholesale_swaps_snapshot() {
        let mut reconciler = five();
        let change = ChangeDescription::wholesale(reconciler.current(), snapshot(2, &["z"]));
        assert_eq!(reconciler.apply(change).unwrap(), UpdatePlan::Wholesale);
        assert_eq!(reconciler.current().len(), 1);
    }

    #[test]
    fn test_generation_mismatch_rejected() {
        let mut reconciler = five();
        let stale = snapshot(0, &[]);
        let change = ChangeDescription::wholesale(&stale, snapshot(2, &[]));
        assert!(!reconciler.concerns(&change));
        assert_eq!(
            reconciler.apply(change),
            Err(ReconcileError::GenerationMismatch {
                expected: 1,
                found: 0
            })
        );
        assert_eq!(reconciler.current().generation(), 1);
    }

    fn rejected(changes: IndexChanges, resulting: &[&str]) -> ReconcileError {
        let mut reconciler = five();
        let change =
            ChangeDescription::incremental(reconciler.current(), changes, snapshot(2, resulting));
        let err = reconciler.apply(change).unwrap_err();
        assert_eq!(reconciler.current().generation(), 1);
        err
    }

    #[test]
    fn test_removed_out_of_bounds() {
        let err = rejected(
            IndexChanges {
                removed: BTreeSet::from([5]),
                ..Default::default()
            },
            &["a", "b", "c", "d"],
        );
        assert_eq!(err, ReconcileError::RemovedOutOfBounds { index: 5, len: 5 });
    }

    #[test]
    fn test_inserted_out_of_bounds() {
        let err = rejected(
            IndexChanges {
                inserted: BTreeSet::from([6]),
                ..Default::default()
            },
            &["a", "b", "c", "d", "e", "f"],
        );
        assert_eq!(err, ReconcileError::InsertedOutOfBounds { index: 6, len: 6 });
    }

    #[test]
    fn test_changed_and_removed_rejected() {
        let err = rejected(
            IndexChanges {
                removed: BTreeSet::from([1]),
                changed: BTreeSet::from([1]),
                ..Default::default()
            },
            &["a", "c", "d", "e"],
        );
        assert_eq!(err, ReconcileError::ChangedAndRemoved { index: 1 });
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let err = rejected(
            IndexChanges {
                removed: BTreeSet::from([0]),
                ..Default::default()
            },
            &["b", "c", "d", "e", "f"],
        );
        assert!(matches!(err, ReconcileError::CountMismatch { prior: 5, .. }));
    }

    #[test]
    fn test_move_bounds_checked_against_resulting_length() {
        let err = rejected(
            IndexChanges {
                removed: BTreeSet::from([0]),
                moves: vec![IndexMove::new(0, 4)],
                ..Default::default()
            },
            &["b", "c", "d", "e"],
        );
        assert_eq!(
            err,
            ReconcileError::MoveOutOfBounds {
                from: 0,
                to: 4,
                len: 4
            }
        );
    }

    #[test]
    fn test_duplicate_move_target_rejected() {
        let err = rejected(
            IndexChanges {
                moves: vec![IndexMove::new(0, 2), IndexMove::new(1, 2)],
                ..Default::default()
            },
            &["a", "b", "c", "d", "e"],
        );
        assert_eq!(
            err,
            ReconcileError::DuplicateMove {
                index: 2,
                side: "target"
            }
        );
    }

    #[test]
    fn test_duplicate_move_source_rejected() {
        let err = rejected(
            IndexChanges {
                moves: vec![IndexMove::new(1, 3), IndexMove::new(1, 4)],
                ..Default::default()
            },
            &["a", "b", "c", "d", "e"],
        );
        assert_eq!(
            err,
            ReconcileError::DuplicateMove {
                index: 1,
                side: "source"
            }
        );
    }

    #[test]
    fn test_resync_replaces_current_and_accepts_next_change() {
        let mut reconciler = five();
        reconciler.resync(snapshot(3, &["a", "b"]));
        assert_eq!(reconciler.current().generation(), 3);

        let change = ChangeDescription::wholesale(reconciler.current(), snapshot(4, &["c"]));
        assert_eq!(reconciler.apply(change).unwrap(), UpdatePlan::Wholesale);
        assert_eq!(reconciler.current().len(), 1);
    }
}
