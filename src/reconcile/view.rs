use std::collections::HashMap;

use tracing::{trace, warn};

use super::plan::{permute, IncrementalPlan, PlanStep, UpdatePlan};
use crate::error::ReconcileError;
use crate::models::{CollectionSnapshot, ItemId};

/// A live, indexable presentation of the collection.
pub trait IndexedView {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn id_at(&self, index: usize) -> Option<&ItemId>;

    /// Discards everything and shows `snapshot`.
    fn reload_data(&mut self, snapshot: &CollectionSnapshot);

    /// Applies `plan` in step order as one batch. On error the view is left
    /// as it was before the call.
    fn perform_batch_updates(
        &mut self,
        plan: &IncrementalPlan,
        resulting: &CollectionSnapshot,
    ) -> Result<(), ReconcileError>;

    fn apply_plan(
        &mut self,
        plan: &UpdatePlan,
        resulting: &CollectionSnapshot,
    ) -> Result<(), ReconcileError> {
        match plan {
            UpdatePlan::Wholesale => {
                self.reload_data(resulting);
                Ok(())
            }
            UpdatePlan::Incremental(plan) => self.perform_batch_updates(plan, resulting),
        }
    }
}

/// One displayed element. `revision` counts in-place reloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewCell {
    pub id: ItemId,
    pub revision: u64,
}

impl ViewCell {
    fn fresh(id: ItemId) -> Self {
        Self { id, revision: 0 }
    }
}

/// In-memory `IndexedView` that checks it converges on every resulting
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct LiveView {
    cells: Vec<ViewCell>,
    full_reloads: u64,
}

impl LiveView {
    pub fn new(snapshot: &CollectionSnapshot) -> Self {
        let mut view = Self::default();
        view.reload_data(snapshot);
        view.full_reloads = 0;
        view
    }

    pub fn cells(&self) -> &[ViewCell] {
        &self.cells
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.cells.iter().map(|cell| cell.id.clone()).collect()
    }

    pub fn revision_of(&self, id: &ItemId) -> Option<u64> {
        self.cells
            .iter()
            .find(|cell| &cell.id == id)
            .map(|cell| cell.revision)
    }

    /// Number of `reload_data` calls since creation.
    pub fn full_reloads(&self) -> u64 {
        self.full_reloads
    }
}

impl IndexedView for LiveView {
    fn len(&self) -> usize {
        self.cells.len()
    }

    fn id_at(&self, index: usize) -> Option<&ItemId> {
        self.cells.get(index).map(|cell| &cell.id)
    }

    fn reload_data(&mut self, snapshot: &CollectionSnapshot) {
        self.cells = snapshot.iter().cloned().map(ViewCell::fresh).collect();
        self.full_reloads += 1;
        trace!(count = self.cells.len(), "Reloaded view");
    }

    fn perform_batch_updates(
        &mut self,
        plan: &IncrementalPlan,
        resulting: &CollectionSnapshot,
    ) -> Result<(), ReconcileError> {
        let prior_len = self.cells.len();

        // Reload targets are prior indices; pin them by identity before
        // deletes shift anything.
        let mut reload_ids = Vec::with_capacity(plan.reloads.len());
        for &index in &plan.reloads {
            let cell = self
                .cells
                .get(index)
                .ok_or(ReconcileError::ChangedOutOfBounds {
                    index,
                    len: prior_len,
                })?;
            reload_ids.push(cell.id.clone());
        }

        let mut cells = self.cells.clone();
        for step in plan.steps() {
            match step {
                PlanStep::Delete(indices) => {
                    if let Some(&index) = indices.iter().find(|&&i| i >= prior_len) {
                        return Err(ReconcileError::RemovedOutOfBounds {
                            index,
                            len: prior_len,
                        });
                    }
                    let mut position = 0;
                    cells.retain(|_| {
                        let keep = !indices.contains(&position);
                        position += 1;
                        keep
                    });
                }
                PlanStep::Insert(indices) => {
                    for &index in indices {
                        let id = resulting.get(index).cloned().ok_or(
                            ReconcileError::InsertedOutOfBounds {
                                index,
                                len: resulting.len(),
                            },
                        )?;
                        if index > cells.len() {
                            return Err(ReconcileError::InsertedOutOfBounds {
                                index,
                                len: cells.len(),
                            });
                        }
                        cells.insert(index, ViewCell::fresh(id));
                    }
                }
                PlanStep::Reload(_) => {
                    let mut positions: HashMap<&ItemId, usize> = HashMap::new();
                    for (i, cell) in cells.iter().enumerate() {
                        positions.entry(&cell.id).or_insert(i);
                    }
                    let targets: Vec<usize> = reload_ids
                        .iter()
                        .filter_map(|id| positions.get(id).copied())
                        .collect();
                    for i in targets {
                        cells[i].revision += 1;
                    }
                }
                PlanStep::Move(moves) => {
                    let len = cells.len();
                    if let Some(mv) = moves.iter().find(|mv| mv.from >= len || mv.to >= len) {
                        return Err(ReconcileError::MoveOutOfBounds {
                            from: mv.from,
                            to: mv.to,
                            len,
                        });
                    }
                    cells = permute(cells, moves);
                }
            }
        }

        if let Some(index) = first_divergence(&cells, resulting) {
            warn!(index, "View diverged from resulting snapshot");
            return Err(ReconcileError::ViewDiverged { index });
        }

        self.cells = cells;
        Ok(())
    }
}

fn first_divergence(cells: &[ViewCell], resulting: &CollectionSnapshot) -> Option<usize> {
    let mismatch = cells
        .iter()
        .zip(resulting.iter())
        .position(|(cell, id)| &cell.id != id);
    match mismatch {
        Some(index) => Some(index),
        None if cells.len() != resulting.len() => Some(cells.len().min(resulting.len())),
        None => None,
    }
}
