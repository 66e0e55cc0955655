use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::GridConfig;
use crate::error::ReconcileError;
use crate::geometry::Extent;
use crate::layout::{GridLayout, GridQuery, Viewport, ViewportQuery};
use crate::models::{ChangeDescription, CollectionSnapshot, ItemId};
use crate::preheat::{
    AssetCacheController, ImageCachingService, PreheatUpdate, PreheatWindowCalculator,
    ThumbnailSpec,
};
use crate::reconcile::{ChangeReconciler, IndexedView, LiveView, UpdatePlan};
use crate::thumbnails::{DeliveryOutcome, SlotBinder, Thumbnail};

/// A scrolling grid over an externally maintained collection.
///
/// Owns every piece of mutable grid state, so it must live on a single apply
/// context (see [`GridSession`](super::GridSession)). Slot `i` displays the
/// `i`th visible index; scrolling rebinds slots to new identifiers the way a
/// recycling grid reuses cells.
pub struct AssetGrid<S: ?Sized> {
    config: GridConfig,
    layout: GridLayout,
    viewport: Viewport,
    cache: AssetCacheController<S>,
    reconciler: ChangeReconciler,
    view: LiveView,
    slots: SlotBinder,
    visible: bool,
}

impl<S: ImageCachingService + ?Sized> AssetGrid<S> {
    pub fn new(
        config: GridConfig,
        service: Arc<S>,
        snapshot: CollectionSnapshot,
        width: f64,
        height: f64,
    ) -> Self {
        let layout = GridLayout::new(&config.layout, width);
        let spec = Self::spec_for(&config, &layout);
        let window = PreheatWindowCalculator::new(&config.preheat);
        let mut cache = AssetCacheController::new(service, window, spec);
        cache.reset_all();

        debug!(
            items = snapshot.len(),
            cell_size = layout.cell_size(),
            ?spec,
            "Created asset grid"
        );

        Self {
            view: LiveView::new(&snapshot),
            reconciler: ChangeReconciler::new(snapshot),
            viewport: Viewport::new(width, height),
            config,
            layout,
            cache,
            slots: SlotBinder::new(0),
            visible: false,
        }
    }

    fn spec_for(config: &GridConfig, layout: &GridLayout) -> ThumbnailSpec {
        ThumbnailSpec::for_cell(
            layout.cell_size(),
            config.thumbnails.display_scale,
            config.thumbnails.content_mode,
        )
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &CollectionSnapshot {
        self.reconciler.current()
    }

    pub fn view(&self) -> &LiveView {
        &self.view
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn controller(&self) -> &AssetCacheController<S> {
        &self.cache
    }

    pub fn slots(&self) -> &SlotBinder {
        &self.slots
    }

    pub fn spec(&self) -> ThumbnailSpec {
        self.cache.spec()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn query(&self) -> GridQuery<'_> {
        GridQuery {
            layout: &self.layout,
            viewport: &self.viewport,
            snapshot: self.reconciler.current(),
        }
    }

    pub fn items_in_extent(&self, extent: Extent) -> Vec<ItemId> {
        self.query().items_in_extent(extent)
    }

    /// Identifiers currently displayed, in slot order.
    pub fn displayed(&self) -> Vec<ItemId> {
        (0..self.slots.len())
            .filter_map(|slot| self.slots.bound_id(slot).cloned())
            .collect()
    }

    pub fn slot_image(&self, slot: usize) -> Option<&Arc<Thumbnail>> {
        self.slots.image(slot)
    }

    pub fn appear(&mut self) {
        self.visible = true;
        self.bind_visible_slots(true);
        self.update_cached_assets();
    }

    pub fn disappear(&mut self) {
        self.visible = false;
        self.slots.unbind_all();
        self.cache.reset_all();
    }

    pub fn scroll_to(&mut self, offset: f64) -> PreheatUpdate {
        let content = self.layout.content_length(self.snapshot().len());
        self.viewport.scroll_to(offset, content);
        self.bind_visible_slots(false);
        self.update_cached_assets()
    }

    /// Applies a new viewport size. A different cell size changes the
    /// thumbnail target, which resets caching.
    pub fn resize(&mut self, width: f64, height: f64) {
        let cell_changed = self.layout.set_width(width);
        self.viewport.width = width.max(0.0);
        self.viewport.height = height.max(0.0);
        let content = self.layout.content_length(self.snapshot().len());
        self.viewport.scroll_to(self.viewport.offset, content);

        if cell_changed {
            self.cache.set_spec(Self::spec_for(&self.config, &self.layout));
        }
        self.bind_visible_slots(cell_changed);
        self.update_cached_assets();
    }

    /// Moves the preheat window to follow the viewport. Does nothing while
    /// the grid is hidden.
    pub fn update_cached_assets(&mut self) -> PreheatUpdate {
        if !self.visible {
            return PreheatUpdate::default();
        }
        let query = GridQuery {
            layout: &self.layout,
            viewport: &self.viewport,
            snapshot: self.reconciler.current(),
        };
        self.cache.update_window(
            query.visible_extent(),
            self.viewport.height,
            |extent| query.items_in_extent(extent),
        )
    }

    /// Reconciles an external change.
    ///
    /// Returns `Ok(None)` when the change was computed against an older
    /// generation and was ignored. A change based on a newer generation means
    /// an earlier one was missed or rejected; the grid then reloads wholesale
    /// from the change's resulting snapshot. A change the view cannot converge
    /// on forces a full reload before the error is returned.
    pub fn library_did_change(
        &mut self,
        change: ChangeDescription,
    ) -> Result<Option<UpdatePlan>, ReconcileError> {
        let current = self.snapshot().generation();
        if change.base_generation < current {
            debug!(
                current,
                base = change.base_generation,
                "Ignoring change for an older generation"
            );
            return Ok(None);
        }
        if change.base_generation > current {
            warn!(
                current,
                base = change.base_generation,
                resulting = change.resulting.generation(),
                "Missed a library change, reloading"
            );
            self.reconciler.resync(change.resulting);
            self.view.reload_data(self.reconciler.current());
            self.refresh_after_change();
            return Ok(Some(UpdatePlan::Wholesale));
        }

        let plan = self.reconciler.apply(change)?;
        let applied = self.view.apply_plan(&plan, self.reconciler.current());
        if let Err(e) = &applied {
            warn!(error = %e, "Batch update failed, reloading view");
            self.view.reload_data(self.reconciler.current());
        }
        self.refresh_after_change();

        applied.map(|()| Some(plan))
    }

    /// Re-clamps the scroll position, resets caching and, when shown,
    /// rebinds slots and restarts preheating for the new collection.
    fn refresh_after_change(&mut self) {
        let content = self.layout.content_length(self.snapshot().len());
        self.viewport.scroll_to(self.viewport.offset, content);
        self.cache.reset_all();
        if self.visible {
            self.bind_visible_slots(true);
            self.update_cached_assets();
        }
    }

    /// Binds slots to the visible identifiers and requests their thumbnails.
    /// Slots already showing the right identifier are kept unless `force`.
    fn bind_visible_slots(&mut self, force: bool) {
        if !self.visible {
            return;
        }
        let range = self.query().visible_indices();
        self.slots.resize(range.len());

        let spec = self.cache.spec();
        for (slot, index) in range.enumerate() {
            let Some(id) = self.reconciler.current().get(index).cloned() else {
                break;
            };
            if !force && self.slots.bound_id(slot) == Some(&id) {
                continue;
            }
            let ticket = self.slots.bind(slot, id.clone());
            if let Err(e) = self.cache.service().request_thumbnail(&id, spec, ticket) {
                warn!(%id, error = %e, "Failed to request thumbnail");
            }
        }
    }

    /// Applies delivered thumbnails, dropping any whose slot was rebound in
    /// the meantime. Returns how many were applied.
    pub fn pump_thumbnails(&mut self) -> usize {
        let mut applied = 0;
        let mut stale = 0;
        for delivery in self.cache.service().take_deliveries() {
            match self.slots.accept(delivery) {
                DeliveryOutcome::Applied => applied += 1,
                DeliveryOutcome::Stale => stale += 1,
            }
        }
        if applied + stale > 0 {
            trace!(applied, stale, "Pumped thumbnail deliveries");
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use super::*;
    use crate::models::{IndexChanges, IndexMove};
    use crate::testing::{CacheCall, RecordingCacheService};

    fn ids(count: usize) -> Vec<ItemId> {
        (0..count).map(|i| ItemId::from(format!("item-{i}"))).collect()
    }

    /// 4 columns of 100pt cells, 300pt tall viewport: 12 visible items.
    fn grid(count: usize) -> AssetGrid<RecordingCacheService> {
        let config = GridConfig::default().with_columns(4).with_spacing(0.0);
        AssetGrid::new(
            config,
            Arc::new(RecordingCacheService::new()),
            CollectionSnapshot::new(1, ids(count)),
            400.0,
            300.0,
        )
    }

    fn service(grid: &AssetGrid<RecordingCacheService>) -> &RecordingCacheService {
        grid.controller().service()
    }

    #[test]
    fn test_new_resets_caching_and_stays_hidden() {
        let mut grid = grid(100);
        assert_eq!(service(&grid).calls(), vec![CacheCall::StopAll]);
        assert!(grid.update_cached_assets().is_empty());
        assert_eq!(grid.spec().width, 200);
    }

    #[test]
    fn test_appear_binds_visible_and_preheats() {
        let mut grid = grid(100);
        grid.appear();

        assert_eq!(grid.displayed(), ids(12));
        // Window (-150, 600) covers rows 0..5.
        assert_eq!(service(&grid).started(), ids(20));
    }

    #[test]
    fn test_small_scroll_is_ignored_by_preheat() {
        let mut grid = grid(100);
        grid.appear();
        service(&grid).clear_calls();

        assert!(grid.scroll_to(50.0).is_empty());
        assert!(grid.scroll_to(100.0).is_empty());
        assert!(!grid.scroll_to(101.0).is_empty());
    }

    #[test]
    fn test_scroll_rebinds_slots_and_drops_stale_results() {
        let mut grid = grid(100);
        grid.appear();
        grid.scroll_to(100.0);

        // Every slot was rebound; the first round of requests is stale.
        service(&grid).complete(&ItemId::from("item-0"));
        assert_eq!(grid.pump_thumbnails(), 0);

        // Slot 0 now shows item-4, requested twice (appear + scroll).
        service(&grid).complete(&ItemId::from("item-4"));
        assert_eq!(grid.pump_thumbnails(), 1);
        assert!(grid.slot_image(0).is_some());
    }

    #[test]
    fn test_out_of_order_deliveries_land_in_their_slots() {
        let mut grid = grid(8);
        grid.appear();
        service(&grid).complete_all_reversed();
        assert_eq!(grid.pump_thumbnails(), 8);
        assert!((0..8).all(|slot| grid.slot_image(slot).is_some()));
    }

    #[test]
    fn test_disappear_resets_and_hidden_grid_does_not_preheat() {
        let mut grid = grid(100);
        grid.appear();
        grid.disappear();
        assert_eq!(service(&grid).calls().last(), Some(&CacheCall::StopAll));
        assert!(grid.displayed().is_empty());

        service(&grid).clear_calls();
        grid.scroll_to(1000.0);
        assert!(service(&grid).calls().is_empty());
    }

    #[test]
    fn test_change_applies_resets_and_refills() {
        let mut grid = grid(5);
        grid.appear();
        service(&grid).clear_calls();

        let old = grid.snapshot().clone();
        let mut next = old.items().to_vec();
        next.remove(0);
        next.push(ItemId::from("new"));
        let change = ChangeDescription::between(
            &old,
            CollectionSnapshot::new(2, next.clone()),
            &HashSet::new(),
        );

        let plan = grid.library_did_change(change).unwrap();
        assert!(matches!(plan, Some(UpdatePlan::Incremental(_))));
        assert_eq!(grid.view().ids(), next);
        assert_eq!(grid.displayed(), next);

        let calls = service(&grid).calls();
        let stop_all = calls.iter().position(|c| *c == CacheCall::StopAll).unwrap();
        let start = calls
            .iter()
            .position(|c| matches!(c, CacheCall::Start(_)))
            .unwrap();
        assert!(stop_all < start);
    }

    #[test]
    fn test_change_for_older_generation_is_ignored() {
        let mut grid = grid(5);
        let stale = CollectionSnapshot::new(0, ids(1));
        let change = ChangeDescription::wholesale(&stale, CollectionSnapshot::new(1, ids(2)));
        assert_eq!(grid.library_did_change(change), Ok(None));
        assert_eq!(grid.snapshot().generation(), 1);
        assert_eq!(grid.view().len(), 5);
    }

    #[test]
    fn test_rejected_change_is_recovered_by_next_change() {
        let mut grid = grid(5);
        grid.appear();
        let base = grid.snapshot().clone();
        let bad = ChangeDescription::incremental(
            &base,
            IndexChanges {
                removed: BTreeSet::from([9]),
                ..Default::default()
            },
            CollectionSnapshot::new(2, ids(4)),
        );
        assert!(grid.library_did_change(bad).is_err());
        assert_eq!(grid.snapshot().generation(), 1);

        service(&grid).clear_calls();
        let missed = CollectionSnapshot::new(2, ids(4));
        let latest = CollectionSnapshot::new(3, ids(3));
        let next = ChangeDescription::between(&missed, latest.clone(), &HashSet::new());

        assert_eq!(grid.library_did_change(next), Ok(Some(UpdatePlan::Wholesale)));
        assert_eq!(grid.snapshot(), &latest);
        assert_eq!(grid.view().ids(), latest.items());
        assert_eq!(grid.displayed(), ids(3));
        assert_eq!(service(&grid).calls().first(), Some(&CacheCall::StopAll));
    }

    #[test]
    fn test_huge_viewport_does_not_overflow() {
        let mut grid = grid(10);
        grid.appear();
        grid.resize(400.0, 1e30);
        assert_eq!(grid.displayed(), ids(10));
        assert_eq!(grid.items_in_extent(Extent::new(0.0, f64::INFINITY)), ids(10));
    }

    #[test]
    fn test_contract_violation_is_surfaced() {
        let mut grid = grid(5);
        let base = grid.snapshot().clone();
        let change = ChangeDescription::incremental(
            &base,
            IndexChanges {
                removed: BTreeSet::from([9]),
                ..Default::default()
            },
            CollectionSnapshot::new(2, ids(4)),
        );
        assert_eq!(
            grid.library_did_change(change),
            Err(ReconcileError::RemovedOutOfBounds { index: 9, len: 5 })
        );
        assert_eq!(grid.view().len(), 5);
    }

    #[test]
    fn test_diverging_moves_reload_view() {
        let mut grid = grid(3);
        let base = grid.snapshot().clone();
        // Claims a swap of 0 and 1 but the resulting snapshot swaps 0 and 2.
        let resulting = CollectionSnapshot::new(
            2,
            vec![
                ItemId::from("item-2"),
                ItemId::from("item-1"),
                ItemId::from("item-0"),
            ],
        );
        let change = ChangeDescription::incremental(
            &base,
            IndexChanges {
                moves: vec![IndexMove::new(0, 1), IndexMove::new(1, 0)],
                ..Default::default()
            },
            resulting.clone(),
        );

        assert_eq!(
            grid.library_did_change(change),
            Err(ReconcileError::ViewDiverged { index: 0 })
        );
        assert_eq!(grid.view().ids(), resulting.items());
        assert_eq!(grid.snapshot(), &resulting);
    }

    #[test]
    fn test_resize_changes_spec_and_resets() {
        let mut grid = grid(100);
        grid.appear();
        service(&grid).clear_calls();

        grid.resize(800.0, 300.0);
        assert_eq!(grid.spec().width, 400);
        let calls = service(&grid).calls();
        assert_eq!(calls.first(), Some(&CacheCall::StopAll));
        assert!(calls.iter().any(|c| matches!(c, CacheCall::Start(_))));
    }
}
