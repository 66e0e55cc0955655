use std::collections::BTreeSet;

use crate::models::IndexMove;

/// What the view layer must do to reflect one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    Incremental(IncrementalPlan),
    /// Indices are unreliable; reload the whole view from the new snapshot.
    Wholesale,
}

impl UpdatePlan {
    pub fn is_wholesale(&self) -> bool {
        matches!(self, UpdatePlan::Wholesale)
    }
}

/// Index-level structural updates.
///
/// `deletes` and `reloads` index the prior snapshot, `inserts` the resulting
/// one, and `moves` the arrangement reached once deletes and inserts are in.
/// Deletes and inserts are batches: every index refers to its snapshot as a
/// whole, never to a partially updated arrangement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementalPlan {
    pub deletes: BTreeSet<usize>,
    pub inserts: BTreeSet<usize>,
    pub reloads: BTreeSet<usize>,
    pub moves: Vec<IndexMove>,
}

/// One step of an incremental plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep<'a> {
    Delete(&'a BTreeSet<usize>),
    Insert(&'a BTreeSet<usize>),
    Reload(&'a BTreeSet<usize>),
    Move(&'a [IndexMove]),
}

impl IncrementalPlan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
            && self.inserts.is_empty()
            && self.reloads.is_empty()
            && self.moves.is_empty()
    }

    /// Non-empty steps in application order: delete, insert, reload, move.
    pub fn steps(&self) -> impl Iterator<Item = PlanStep<'_>> {
        [
            (!self.deletes.is_empty()).then_some(PlanStep::Delete(&self.deletes)),
            (!self.inserts.is_empty()).then_some(PlanStep::Insert(&self.inserts)),
            (!self.reloads.is_empty()).then_some(PlanStep::Reload(&self.reloads)),
            (!self.moves.is_empty()).then_some(PlanStep::Move(&self.moves)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Applies `moves` to `items` as one simultaneous permutation.
///
/// Moved elements land on their targets; everything else fills the remaining
/// positions in its existing order. Indices must already be validated as in
/// bounds and unique on each side.
pub fn permute<T>(items: Vec<T>, moves: &[IndexMove]) -> Vec<T> {
    if moves.is_empty() {
        return items;
    }

    let len = items.len();
    let mut source: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut placed: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();

    for mv in moves {
        placed[mv.to] = source[mv.from].take();
    }

    let mut rest = source.into_iter().flatten();
    placed
        .into_iter()
        .filter_map(|slot| slot.or_else(|| rest.next()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_follow_fixed_order() {
        let plan = IncrementalPlan {
            deletes: BTreeSet::from([2]),
            inserts: BTreeSet::from([0]),
            reloads: BTreeSet::from([4]),
            moves: vec![IndexMove::new(1, 3)],
        };
        let kinds: Vec<&str> = plan
            .steps()
            .map(|step| match step {
                PlanStep::Delete(_) => "delete",
                PlanStep::Insert(_) => "insert",
                PlanStep::Reload(_) => "reload",
                PlanStep::Move(_) => "move",
            })
            .collect();
        assert_eq!(kinds, vec!["delete", "insert", "reload", "move"]);
    }

    #[test]
    fn test_steps_skip_empty() {
        let plan = IncrementalPlan {
            reloads: BTreeSet::from([1]),
            ..Default::default()
        };
        assert_eq!(plan.steps().count(), 1);
        assert!(IncrementalPlan::default().is_empty());
    }

    #[test]
    fn test_permute_single_move_shifts_the_rest() {
        let out = permute(vec!['x', 'a', 'b', 'd', 'e'], &[IndexMove::new(1, 3)]);
        assert_eq!(out, vec!['x', 'b', 'd', 'a', 'e']);
    }

    #[test]
    fn test_permute_is_simultaneous() {
        // Sequential application would move 'c' twice.
        let out = permute(
            vec!['a', 'b', 'c'],
            &[IndexMove::new(0, 2), IndexMove::new(2, 0)],
        );
        assert_eq!(out, vec!['c', 'b', 'a']);
    }

    #[test]
    fn test_permute_rotation() {
        let out = permute(
            vec![0, 1, 2, 3],
            &[
                IndexMove::new(0, 1),
                IndexMove::new(1, 2),
                IndexMove::new(2, 3),
                IndexMove::new(3, 0),
            ],
        );
        assert_eq!(out, vec![3, 0, 1, 2]);
    }
}
