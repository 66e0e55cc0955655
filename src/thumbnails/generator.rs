//! Thumbnail generation using the image crate.
//!
//! Source images come from a `ThumbnailSource` (the asset library) and are
//! scaled into the requested `ThumbnailSpec`: aspect-fill produces exactly the
//! target size with the overflow cropped, aspect-fit preserves the whole image
//! inside the target.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::trace;

use crate::models::ItemId;
use crate::preheat::{ContentMode, ThumbnailSpec};

/// Estimated bytes per pixel for RGBA thumbnails.
const BYTES_PER_PIXEL: usize = 4;

/// Provides full-size source images for thumbnail generation.
pub trait ThumbnailSource: Send + Sync {
    fn load(&self, id: &ItemId) -> Result<DynamicImage>;
}

/// A decoded thumbnail ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbaImage,
}

impl Thumbnail {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        }
    }

    /// A single-colour thumbnail, used as placeholder content.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let [r, g, b] = rgb;
        Self::from_rgba(RgbaImage::from_pixel(
            width.max(1),
            height.max(1),
            image::Rgba([r, g, b, 0xff]),
        ))
    }

    pub fn memory_bytes(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

pub struct ThumbnailGenerator;

impl ThumbnailGenerator {
    /// Loads `id` from `source` and scales it to `spec`.
    pub fn generate(
        source: &dyn ThumbnailSource,
        id: &ItemId,
        spec: ThumbnailSpec,
    ) -> Result<Thumbnail> {
        let img = source
            .load(id)
            .with_context(|| format!("Failed to load source image for {}", id))?;
        trace!(%id, ?spec, "Generating thumbnail");
        Ok(Self::scale(&img, spec))
    }

    /// Scales a decoded image to `spec`.
    pub fn scale(img: &DynamicImage, spec: ThumbnailSpec) -> Thumbnail {
        let scaled = match spec.mode {
            // CatmullRom provides good quality/speed balance for downscaling
            ContentMode::AspectFill => {
                img.resize_to_fill(spec.width, spec.height, FilterType::CatmullRom)
            }
            ContentMode::AspectFit => {
                let (src_w, src_h) = img.dimensions();
                let (w, h) = Self::fit_dimensions(src_w, src_h, spec.width, spec.height);
                img.resize_exact(w, h, FilterType::CatmullRom)
            }
        };
        Thumbnail::from_rgba(scaled.to_rgba8())
    }

    /// Largest size with the source aspect ratio that fits inside the target.
    fn fit_dimensions(src_width: u32, src_height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
        if src_width == 0 || src_height == 0 {
            return (max_w.max(1), max_h.max(1));
        }

        let scale = (max_w as f64 / src_width as f64).min(max_h as f64 / src_height as f64);
        let w = (src_width as f64 * scale).round() as u32;
        let h = (src_height as f64 * scale).round() as u32;
        (w.clamp(1, max_w.max(1)), h.clamp(1, max_h.max(1)))
    }
}
