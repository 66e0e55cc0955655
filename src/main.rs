use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use thumbgrid::notify::ChangeHub;
use thumbgrid::thumbnails::ThumbnailCache;
use thumbgrid::{logging, AssetGrid, GridConfig, GridSession, MediaLibrary};

const INITIAL_ASSETS: usize = 600;
const VIEWPORT: (f64, f64) = (390.0, 844.0);
const SCROLL_STEPS: usize = 120;
const SCROLL_STEP: f64 = 90.0;
const CHANGE_ROUNDS: usize = 12;

fn main() -> Result<()> {
    logging::init()?;

    let config = GridConfig::load_or_default().context("Failed to load config")?;
    let hub = Arc::new(ChangeHub::new());
    let library = Arc::new(MediaLibrary::with_generated(Arc::clone(&hub), INITIAL_ASSETS));
    let cache = Arc::new(ThumbnailCache::from_config(library.clone(), &config)?);

    let grid = AssetGrid::new(
        config,
        Arc::clone(&cache),
        library.snapshot(),
        VIEWPORT.0,
        VIEWPORT.1,
    );
    let session = GridSession::start(grid, hub)?;
    info!(assets = library.len(), "Simulation started");

    let editor = {
        let library = Arc::clone(&library);
        thread::Builder::new()
            .name("library-editor".into())
            .spawn(move || edit_library(&library))
            .context("Failed to spawn library editor")?
    };

    let mut applied = 0;
    for step in 0..SCROLL_STEPS {
        let offset = step as f64 * SCROLL_STEP;
        applied += session.with_grid(move |grid| {
            grid.scroll_to(offset);
            grid.pump_thumbnails()
        })?;
        thread::sleep(Duration::from_millis(10));
    }

    if editor.join().is_err() {
        warn!("Library editor panicked");
    }

    cache.wait_idle(Duration::from_millis(500));
    applied += session.with_grid(|grid| grid.pump_thumbnails())?;

    let grid = session.stop()?;
    info!(
        generation = grid.snapshot().generation(),
        items = grid.snapshot().len(),
        thumbnails_applied = applied,
        stats = ?cache.stats(),
        "Simulation finished"
    );
    Ok(())
}

/// Background edits: one batch per round mixing all change kinds.
fn edit_library(library: &MediaLibrary) {
    for round in 0..CHANGE_ROUNDS {
        let asset = library.generate_asset();
        library.perform_changes(|batch| {
            let len = batch.len().max(1);
            batch.insert((round * 7) % len, asset);
            if let Some(id) = batch.id_at((round * 3) % len).cloned() {
                batch.update(&id, (round * 40) as u16);
            }
            if round % 3 == 0 {
                if let Some(id) = batch.id_at(0).cloned() {
                    batch.remove(&id);
                }
            }
            if round % 4 == 0 {
                if let Some(id) = batch.id_at(1).cloned() {
                    let last = batch.len();
                    batch.move_to(&id, last);
                }
            }
        });
        thread::sleep(Duration::from_millis(60));
    }

    if let Some(id) = library.add_generated_asset() {
        info!(%id, "Added asset");
    }
}
