use tracing::trace;

use crate::config::PreheatConfig;
use crate::geometry::{diff_extents, Extent};
use crate::models::ItemId;

/// Items entering and leaving the preheat window.
///
/// Lists may contain duplicates when a cell straddles two sub-extents;
/// start/stop caching is idempotent, so they are passed along as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreheatUpdate {
    pub to_start: Vec<ItemId>,
    pub to_stop: Vec<ItemId>,
}

impl PreheatUpdate {
    pub fn is_empty(&self) -> bool {
        self.to_start.is_empty() && self.to_stop.is_empty()
    }
}

/// Tracks the extent whose thumbnails are kept warm.
///
/// The preheat window is the visible extent grown by `expansion_factor` of
/// its own length on each side (twice the visible length at the default 0.5).
/// Small scrolls are ignored until the window center has moved more than
/// `viewport_length / hysteresis_divisor`.
#[derive(Debug, Clone)]
pub struct PreheatWindowCalculator {
    previous: Extent,
    expansion_factor: f64,
    hysteresis_divisor: f64,
}

impl PreheatWindowCalculator {
    pub fn new(config: &PreheatConfig) -> Self {
        Self {
            previous: Extent::ZERO,
            expansion_factor: config.expansion_factor,
            hysteresis_divisor: config.hysteresis_divisor,
        }
    }

    /// The extent preheated by the last recomputation.
    pub fn previous_extent(&self) -> Extent {
        self.previous
    }

    /// The preheat window for a visible extent.
    pub fn preheat_extent(&self, visible: Extent) -> Extent {
        visible.outset(visible.length * self.expansion_factor)
    }

    /// Moves the window to follow `visible`.
    ///
    /// Returns an empty update when the move is within the hysteresis
    /// threshold. An empty previous extent always triggers recomputation.
    pub fn update<F>(
        &mut self,
        visible: Extent,
        viewport_length: f64,
        mut items_in_extent: F,
    ) -> PreheatUpdate
    where
        F: FnMut(Extent) -> Vec<ItemId>,
    {
        let candidate = self.preheat_extent(visible);
        let delta = (candidate.center() - self.previous.center()).abs();
        let threshold = viewport_length / self.hysteresis_divisor;
        if !self.previous.is_empty() && delta <= threshold {
            return PreheatUpdate::default();
        }

        let diff = diff_extents(self.previous, candidate);
        let to_start = diff
            .added
            .into_iter()
            .flat_map(&mut items_in_extent)
            .collect();
        let to_stop = diff
            .removed
            .into_iter()
            .flat_map(&mut items_in_extent)
            .collect();

        trace!(
            start = candidate.start,
            length = candidate.length,
            delta,
            "Preheat window recomputed"
        );
        self.previous = candidate;

        PreheatUpdate { to_start, to_stop }
    }

    /// Forgets the preheated extent; the next update recomputes from scratch.
    pub fn reset(&mut self) {
        self.previous = Extent::ZERO;
    }
}

impl Default for PreheatWindowCalculator {
    fn default() -> Self {
        Self::new(&PreheatConfig::default())
    }
}
