//! Headless tile content.
//!
//! `DisplayTile` records what would be drawn instead of drawing it. The demo
//! binary prints it and the tests assert against it; applications with a
//! real surface provide their own [`ContentFactory`].

use crate::{
    core::geo::CacheKey,
    layers::{base::LayerStyle, image::TileData, overlay::OverlayPlacement},
    traits::{ContentFactory, TileContent},
};
use std::fmt;

const NOT_AVAILABLE: &str = "No image available for this zoom level";

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayKind {
    Empty,
    Loading,
    Image { reference: String, bytes: usize },
    Unavailable(String),
    Overlays(Vec<OverlayPlacement>),
    Label(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTile {
    pub key: CacheKey,
    pub kind: DisplayKind,
    pub opacity: f32,
    pub z_index: usize,
    pub visible: bool,
}

impl DisplayTile {
    pub fn new(key: CacheKey, kind: DisplayKind) -> Self {
        Self {
            key,
            kind,
            opacity: 1.0,
            z_index: 0,
            visible: true,
        }
    }

    pub fn empty(key: CacheKey) -> Self {
        Self::new(key, DisplayKind::Empty)
    }

    pub fn unavailable(key: CacheKey) -> Self {
        Self::new(key, DisplayKind::Unavailable(NOT_AVAILABLE.to_string()))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, DisplayKind::Loading | DisplayKind::Unavailable(_))
    }

    pub fn placements(&self) -> &[OverlayPlacement] {
        match &self.kind {
            DisplayKind::Overlays(placements) => placements,
            _ => &[],
        }
    }
}

impl TileContent for DisplayTile {
    fn apply_style(&mut self, style: &LayerStyle) {
        self.opacity = style.opacity;
        self.z_index = style.z_index;
        self.visible = style.visible;
    }
}

impl fmt::Display for DisplayTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DisplayKind::Empty => write!(f, "{} empty", self.key),
            DisplayKind::Loading => write!(f, "{} loading", self.key),
            DisplayKind::Image { reference, bytes } => {
                write!(f, "{} image {} ({} bytes)", self.key, reference, bytes)
            }
            DisplayKind::Unavailable(message) => write!(f, "{} unavailable: {}", self.key, message),
            DisplayKind::Overlays(placements) => write!(f, "{} {} overlays", self.key, placements.len()),
            DisplayKind::Label(text) => write!(f, "{} [{}]", self.key, text),
        }
    }
}

/// Factory for [`DisplayTile`].
#[derive(Debug, Clone)]
pub struct DisplayFactory {
    pub unavailable_message: String,
}

impl Default for DisplayFactory {
    fn default() -> Self {
        Self {
            unavailable_message: NOT_AVAILABLE.to_string(),
        }
    }
}

impl ContentFactory<DisplayTile> for DisplayFactory {
    fn empty(&self, key: CacheKey) -> DisplayTile {
        DisplayTile::empty(key)
    }

    fn loading(&self, key: CacheKey) -> DisplayTile {
        DisplayTile::new(key, DisplayKind::Loading)
    }

    fn image(&self, key: CacheKey, data: &TileData) -> DisplayTile {
        DisplayTile::new(
            key,
            DisplayKind::Image {
                reference: data.reference.clone(),
                bytes: data.bytes.len(),
            },
        )
    }

    fn unavailable(&self, key: CacheKey) -> DisplayTile {
        DisplayTile::new(key, DisplayKind::Unavailable(self.unavailable_message.clone()))
    }

    fn overlays(&self, key: CacheKey, placements: &[OverlayPlacement]) -> DisplayTile {
        DisplayTile::new(key, DisplayKind::Overlays(placements.to_vec()))
    }

    fn debug_label(&self, key: CacheKey, label: &str) -> DisplayTile {
        DisplayTile::new(key, DisplayKind::Label(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_output() {
        let factory = DisplayFactory::default();
        let key = CacheKey::new(2, 1, 3);

        assert!(factory.loading(key).is_placeholder());
        assert!(factory.unavailable(key).is_placeholder());
        assert!(!factory.empty(key).is_placeholder());

        let data = TileData::new("2/1/3.jpg", vec![0; 12]);
        assert_eq!(factory.image(key, &data).to_string(), "2/1/3 image 2/1/3.jpg (12 bytes)");
        assert_eq!(factory.debug_label(key, "x").to_string(), "2/1/3 [x]");
    }
}
