use std::fmt;
use std::sync::Arc;

/// Opaque, stable identifier for an element of the collection.
///
/// Unique within a snapshot and used as the cache key, so asynchronous
/// thumbnail deliveries can be checked against whatever a slot is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(Arc<str>);

impl ItemId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// An asset held by the media library.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub id: ItemId,
    pub width: u32,
    pub height: u32,
    /// Fill colour of the generated source image, as a hue in `0..360`.
    pub hue: u16,
    /// Bumped every time the asset's content is edited in place.
    pub revision: u32,
}

impl MediaAsset {
    pub fn new(id: impl Into<ItemId>, width: u32, height: u32, hue: u16) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            hue: hue % 360,
            revision: 0,
        }
    }

    /// RGB fill colour for the asset's hue at full saturation and brightness.
    pub fn rgb(&self) -> [u8; 3] {
        let h = f32::from(self.hue) / 60.0;
        let x = 1.0 - ((h % 2.0) - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        [
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
        ]
    }
}
