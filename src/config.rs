//! Grid configuration.
//!
//! Read from `<config dir>/thumbgrid/config.toml` when present. Every field has
//! a default, so a partial file (or none at all) is valid.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::preheat::ContentMode;

/// Maximum number of thumbnail worker threads.
pub const MAX_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub layout: LayoutConfig,
    pub preheat: PreheatConfig,
    pub thumbnails: ThumbnailConfig,
}

/// Fixed-column grid geometry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub columns: usize,
    /// Gap between cells on both axes, in points.
    pub spacing: f64,
}

/// Preheat window heuristics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreheatConfig {
    /// Fraction of the visible length added on each side of the visible extent.
    pub expansion_factor: f64,
    /// The window is recomputed only once its center moves more than
    /// `viewport_length / hysteresis_divisor`.
    pub hysteresis_divisor: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Device pixels per point; the thumbnail target is cell size times this.
    pub display_scale: f64,
    pub content_mode: ContentMode,
    pub workers: usize,
    pub queue_size: usize,
    pub memory_entries: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 4,
            spacing: 1.0,
        }
    }
}

impl Default for PreheatConfig {
    fn default() -> Self {
        Self {
            expansion_factor: 0.5,
            hysteresis_divisor: 3.0,
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            display_scale: 2.0,
            content_mode: ContentMode::AspectFill,
            workers: 2,
            queue_size: 256,
            memory_entries: 1024,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            preheat: PreheatConfig::default(),
            thumbnails: ThumbnailConfig::default(),
        }
    }
}

impl GridConfig {
    /// Default config file location based on XDG directories.
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "thumbgrid")
            .context("Failed to determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Parses and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        debug!(?path, "Loaded grid config");
        Ok(config)
    }

    /// Loads the default config file, falling back to defaults if it is absent.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            debug!(?path, "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layout.columns == 0 {
            bail!("layout.columns must be at least 1");
        }
        if !(self.layout.spacing >= 0.0) {
            bail!("layout.spacing must be non-negative");
        }
        if !(self.preheat.expansion_factor >= 0.0) {
            bail!("preheat.expansion_factor must be non-negative");
        }
        if !(self.preheat.hysteresis_divisor > 0.0) {
            bail!("preheat.hysteresis_divisor must be positive");
        }
        if !(self.thumbnails.display_scale > 0.0) {
            bail!("thumbnails.display_scale must be positive");
        }
        if self.thumbnails.queue_size == 0 || self.thumbnails.memory_entries == 0 {
            bail!("thumbnails.queue_size and thumbnails.memory_entries must be non-zero");
        }
        Ok(())
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.layout.columns = columns;
        self
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.layout.spacing = spacing;
        self
    }

    pub fn with_content_mode(mut self, mode: ContentMode) -> Self {
        self.thumbnails.content_mode = mode;
        self
    }

    /// Worker count clamped to `1..=MAX_WORKERS`.
    pub fn worker_count(&self) -> usize {
        self.thumbnails.workers.clamp(1, MAX_WORKERS)
    }
}
