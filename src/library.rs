//! In-memory media library.
//!
//! Stands in for the external asset collection: it owns the ordered assets,
//! applies batched edits, publishes the resulting `ChangeDescription`s
//! through a [`ChangeHub`] and renders solid-colour source images for the
//! thumbnail pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};
use xxhash_rust::xxh3::xxh3_64;

use crate::models::{ChangeDescription, CollectionSnapshot, ItemId, MediaAsset};
use crate::notify::ChangeHub;
use crate::thumbnails::ThumbnailSource;

/// Source image dimensions for generated assets.
const LANDSCAPE: (u32, u32) = (400, 300);
const PORTRAIT: (u32, u32) = (300, 400);

#[derive(Default)]
struct LibraryState {
    generation: u64,
    order: Vec<ItemId>,
    assets: HashMap<ItemId, MediaAsset>,
}

impl LibraryState {
    fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot::new(self.generation, self.order.clone())
    }
}

/// Edits collected by [`MediaLibrary::perform_changes`].
///
/// Operations apply in call order against the evolving arrangement; the
/// published description is derived from the before and after states.
pub struct LibraryBatch<'a> {
    order: &'a mut Vec<ItemId>,
    assets: &'a mut HashMap<ItemId, MediaAsset>,
    updated: HashSet<ItemId>,
}

impl LibraryBatch<'_> {
    /// Inserts `asset` at `index`, clamped to the end. Returns false if an
    /// asset with the same identifier already exists.
    pub fn insert(&mut self, index: usize, asset: MediaAsset) -> bool {
        if self.assets.contains_key(&asset.id) {
            return false;
        }
        let index = index.min(self.order.len());
        self.order.insert(index, asset.id.clone());
        self.assets.insert(asset.id.clone(), asset);
        true
    }

    pub fn push(&mut self, asset: MediaAsset) -> bool {
        self.insert(usize::MAX, asset)
    }

    pub fn remove(&mut self, id: &ItemId) -> bool {
        let Some(position) = self.order.iter().position(|item| item == id) else {
            return false;
        };
        self.order.remove(position);
        self.assets.remove(id);
        self.updated.remove(id);
        true
    }

    /// Edits an asset in place: new fill colour, bumped revision.
    pub fn update(&mut self, id: &ItemId, hue: u16) -> bool {
        let Some(asset) = self.assets.get_mut(id) else {
            return false;
        };
        asset.hue = hue % 360;
        asset.revision += 1;
        self.updated.insert(id.clone());
        true
    }

    /// Moves `id` to `index`, clamped to the end.
    pub fn move_to(&mut self, id: &ItemId, index: usize) -> bool {
        let Some(position) = self.order.iter().position(|item| item == id) else {
            return false;
        };
        let item = self.order.remove(position);
        let index = index.min(self.order.len());
        self.order.insert(index, item);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn id_at(&self, index: usize) -> Option<&ItemId> {
        self.order.get(index)
    }
}

pub struct MediaLibrary {
    state: RwLock<LibraryState>,
    /// Held across mutate-and-publish so observers see changes in
    /// generation order.
    publishing: Mutex<()>,
    hub: Arc<ChangeHub>,
    next_serial: AtomicU64,
}

impl MediaLibrary {
    pub fn new(hub: Arc<ChangeHub>) -> Self {
        Self {
            state: RwLock::new(LibraryState::default()),
            publishing: Mutex::new(()),
            hub,
            next_serial: AtomicU64::new(0),
        }
    }

    /// A library pre-filled with `count` generated assets. Nothing is
    /// published for the initial fill.
    pub fn with_generated(hub: Arc<ChangeHub>, count: usize) -> Self {
        let library = Self::new(hub);
        {
            let mut state = library.state.write();
            for _ in 0..count {
                let asset = library.generate_asset();
                state.order.push(asset.id.clone());
                state.assets.insert(asset.id.clone(), asset);
            }
            state.generation = 1;
        }
        library
    }

    pub fn hub(&self) -> &Arc<ChangeHub> {
        &self.hub
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        self.state.read().snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().order.is_empty()
    }

    pub fn asset(&self, id: &ItemId) -> Option<MediaAsset> {
        self.state.read().assets.get(id).cloned()
    }

    /// Builds a new asset with a hashed colour and orientation.
    pub fn generate_asset(&self) -> MediaAsset {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let hash = xxh3_64(&serial.to_le_bytes());
        let (width, height) = if hash & 1 == 0 { LANDSCAPE } else { PORTRAIT };
        let hue = ((hash >> 8) % 360) as u16;
        MediaAsset::new(format!("asset-{serial:05}"), width, height, hue)
    }

    /// Applies a batch of edits and publishes the resulting change.
    ///
    /// Returns `None` when the batch left the library untouched.
    pub fn perform_changes<F>(&self, edit: F) -> Option<ChangeDescription>
    where
        F: FnOnce(&mut LibraryBatch<'_>),
    {
        let _publishing = self.publishing.lock();
        let change = {
            let mut state = self.state.write();
            let before = state.snapshot();
            let LibraryState { order, assets, .. } = &mut *state;
            let mut batch = LibraryBatch {
                order,
                assets,
                updated: HashSet::new(),
            };
            edit(&mut batch);
            let updated = batch.updated;

            if state.order.as_slice() == before.items() && updated.is_empty() {
                return None;
            }
            state.generation += 1;
            ChangeDescription::between(&before, state.snapshot(), &updated)
        };

        debug!(
            generation = change.resulting.generation(),
            count = change.resulting.len(),
            "Library changed"
        );
        self.hub.publish(&change);
        Some(change)
    }

    /// Appends one generated asset.
    pub fn add_generated_asset(&self) -> Option<ItemId> {
        let asset = self.generate_asset();
        let id = asset.id.clone();
        self.perform_changes(|batch| {
            batch.push(asset);
        })
        .map(|_| id)
    }

    /// Replaces the whole collection. Published as a wholesale change.
    pub fn replace_all(&self, assets: Vec<MediaAsset>) -> ChangeDescription {
        let _publishing = self.publishing.lock();
        let change = {
            let mut state = self.state.write();
            let before = state.snapshot();
            state.order = assets.iter().map(|asset| asset.id.clone()).collect();
            state.assets = assets
                .into_iter()
                .map(|asset| (asset.id.clone(), asset))
                .collect();
            state.generation += 1;
            ChangeDescription::wholesale(&before, state.snapshot())
        };

        debug!(
            generation = change.resulting.generation(),
            "Library replaced"
        );
        self.hub.publish(&change);
        change
    }
}

impl ThumbnailSource for MediaLibrary {
    fn load(&self, id: &ItemId) -> Result<DynamicImage> {
        let asset = self
            .asset(id)
            .with_context(|| format!("No asset {} in library", id))?;
        let [r, g, b] = asset.rgb();
        trace!(%id, width = asset.width, height = asset.height, "Rendering source image");
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            asset.width.max(1),
            asset.height.max(1),
            Rgba([r, g, b, 0xff]),
        )))
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::models::ChangeDetails;
    use crate::notify::{ChangeNotificationSource, ChangeObserver};

    #[derive(Default)]
    struct Collect(Mutex<Vec<ChangeDescription>>);

    impl ChangeObserver for Collect {
        fn library_did_change(&self, change: &ChangeDescription) {
            self.0.lock().push(change.clone());
        }
    }

    fn library(count: usize) -> (MediaLibrary, Arc<Collect>) {
        let hub = Arc::new(ChangeHub::new());
        let seen = Arc::new(Collect::default());
        hub.subscribe(seen.clone());
        (MediaLibrary::with_generated(hub, count), seen)
    }

    #[test]
    fn test_generated_assets_have_expected_shapes() {
        let (lib, _) = library(16);
        assert_eq!(lib.len(), 16);
        assert_eq!(lib.generation(), 1);
        for id in lib.snapshot().iter() {
            let asset = lib.asset(id).unwrap();
            assert!(matches!((asset.width, asset.height), (400, 300) | (300, 400)));
            assert!(asset.hue < 360);
        }
    }

    #[test]
    fn test_perform_changes_publishes_incremental_description() {
        let (lib, seen) = library(4);
        let first = lib.snapshot()[0].clone();
        let second = lib.snapshot()[1].clone();

        let change = lib
            .perform_changes(|batch| {
                batch.remove(&first);
                batch.update(&second, 10);
            })
            .unwrap();

        assert_eq!(change.base_generation, 1);
        assert_eq!(change.resulting.generation(), 2);
        let ChangeDetails::Incremental(changes) = &change.details else {
            panic!("expected incremental change");
        };
        assert_eq!(changes.removed.iter().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(changes.changed.iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(lib.asset(&second).unwrap().revision, 1);
        assert_eq!(seen.0.lock().len(), 1);
    }

    #[test]
    fn test_noop_batch_publishes_nothing() {
        let (lib, seen) = library(2);
        assert!(lib.perform_changes(|_| {}).is_none());
        assert!(lib
            .perform_changes(|batch| {
                batch.remove(&ItemId::from("missing"));
            })
            .is_none());
        assert!(seen.0.lock().is_empty());
        assert_eq!(lib.generation(), 1);
    }

    #[test]
    fn test_replace_all_is_wholesale() {
        let (lib, seen) = library(3);
        let change = lib.replace_all(vec![MediaAsset::new("only", 10, 10, 0)]);
        assert_eq!(change.details, ChangeDetails::Wholesale);
        assert_eq!(lib.len(), 1);
        assert_eq!(seen.0.lock().len(), 1);
    }

    #[test]
    fn test_load_renders_asset_colour() {
        let (lib, _) = library(1);
        let id = lib.snapshot()[0].clone();
        let asset = lib.asset(&id).unwrap();
        let img = lib.load(&id).unwrap().to_rgba8();
        let [r, g, b] = asset.rgb();
        assert_eq!((img.width(), img.height()), (asset.width, asset.height));
        assert_eq!(img.get_pixel(0, 0), &Rgba([r, g, b, 0xff]));
        assert!(lib.load(&ItemId::from("nope")).is_err());
    }

    #[test]
    fn test_add_generated_asset_appends() {
        let (lib, _) = library(2);
        let id = lib.add_generated_asset().unwrap();
        assert_eq!(lib.snapshot().items().last(), Some(&id));
        assert_eq!(lib.generation(), 2);
    }
}
