//! Layer placing point overlays on the tiles they fall on.

use crate::{
    core::geo::{Point, TileIndex},
    layers::{
        base::{BuiltContent, LayerId, LayerKind, LayerOptions, LayerProperties, LayerProvider, ResolvedTile, TileContext},
        cache::TileCache,
    },
    prelude::Arc,
    solar::selection::ImageSelection,
    spatial::{
        overlay::{Overlay, OverlayId},
        quadtree::OverlayQuadTree,
    },
    traits::{ContentFactory, TileContent},
};

/// Where one overlay goes inside one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlacement {
    pub overlay: OverlayId,
    pub content: String,
    /// Pixel position of the content's top-left corner inside the tile.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// The overlay can be activated to show more information.
    pub has_info: bool,
}

/// An overlay was activated and its information should be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayActivation {
    pub layer: LayerId,
    pub overlay: OverlayId,
    pub info: String,
    /// Viewport pixel position of the overlay.
    pub position: Point,
}

/// Pixel position of `overlay` inside the tile `key` resolves to.
pub fn place_overlay(id: OverlayId, overlay: &Overlay, resolved: &ResolvedTile, tile_size: f64) -> OverlayPlacement {
    let key = resolved.key;
    let scale = 2_f64.powi(key.zoom);
    let offset = overlay.effective_offset();
    let (width, height) = overlay.effective_dimensions();

    let x = (scale * overlay.position.x - key.x as f64) * tile_size + resolved.tile_offset;
    let y = (scale * overlay.position.y - key.y as f64) * tile_size + resolved.tile_offset;

    OverlayPlacement {
        overlay: id,
        content: overlay.content.clone(),
        x: (x + offset.x).round(),
        y: (y + offset.y).round(),
        width: width.round(),
        height: height.round(),
        has_info: overlay.info.is_some(),
    }
}

/// Layer of positioned overlays, indexed by a quad-tree.
pub struct OverlayLayer<C: TileContent> {
    properties: LayerProperties,
    cache: TileCache<C>,
    factory: Arc<dyn ContentFactory<C>>,
    tree: OverlayQuadTree,
    selection: Option<ImageSelection>,
    /// Overlays added since the last `take_new_overlays`.
    fresh: Vec<OverlayId>,
}

impl<C: TileContent> OverlayLayer<C> {
    pub fn new(id: LayerId, options: &LayerOptions, factory: Arc<dyn ContentFactory<C>>) -> Self {
        Self::with_kind(id, LayerKind::Overlay, options, factory)
    }

    pub(crate) fn with_kind(
        id: LayerId,
        kind: LayerKind,
        options: &LayerOptions,
        factory: Arc<dyn ContentFactory<C>>,
    ) -> Self {
        Self {
            properties: LayerProperties::new(id, kind, options),
            cache: TileCache::new(),
            factory,
            tree: OverlayQuadTree::new(),
            selection: None,
            fresh: Vec::new(),
        }
    }

    /// Add overlays. Cached tiles are dropped so the next reload shows them.
    pub fn add_overlays<I: IntoIterator<Item = Overlay>>(&mut self, overlays: I) -> Vec<OverlayId> {
        let ids: Vec<OverlayId> = overlays.into_iter().map(|o| self.tree.insert(o)).collect();
        if !ids.is_empty() {
            self.cache.clear();
            self.fresh.extend_from_slice(&ids);
        }
        ids
    }

    pub fn clear_overlays(&mut self) {
        self.tree.clear();
        self.fresh.clear();
        self.cache.clear();
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.tree.get(id)
    }

    pub fn overlays(&self) -> &OverlayQuadTree {
        &self.tree
    }

    pub fn selection(&self) -> Option<&ImageSelection> {
        self.selection.as_ref()
    }

    pub(crate) fn set_selection(&mut self, selection: Option<&ImageSelection>) {
        self.selection = selection.cloned();
    }

    /// Overlays shown on the tile at grid `index`.
    pub fn placements(&mut self, index: TileIndex, context: &TileContext) -> Vec<OverlayPlacement> {
        let resolved = self.properties.resolve(index, context);
        self.placements_for(&resolved, context.tile_size)
    }

    fn placements_for(&mut self, resolved: &ResolvedTile, tile_size: f64) -> Vec<OverlayPlacement> {
        let key = resolved.key;
        let selection = self.selection.as_ref();
        self.tree
            .query(key.x, key.y, key.zoom)
            .into_iter()
            .filter(|(_, overlay)| overlay.scope.matches(selection))
            .map(|(id, overlay)| place_overlay(id, overlay, resolved, tile_size))
            .collect()
    }

    /// Information to show for an activated overlay, if it has any.
    pub fn activation(&self, id: OverlayId, pan: Point, full_size: f64) -> Option<OverlayActivation> {
        let overlay = self.tree.get(id)?;
        let info = overlay.info.clone()?;
        let relative = Point::new(overlay.position.x - 0.5, overlay.position.y - 0.5);
        Some(OverlayActivation {
            layer: self.properties.id,
            overlay: id,
            info,
            position: pan.add(&relative.multiply(full_size).round()),
        })
    }

    pub(crate) fn drain_fresh(&mut self) -> Vec<OverlayId> {
        std::mem::take(&mut self.fresh)
    }
}

impl<C: TileContent> LayerProvider<C> for OverlayLayer<C> {
    impl_layer_trait!(C, properties, cache);

    fn create_tile_content(&mut self, resolved: &ResolvedTile, context: &TileContext) -> BuiltContent<C> {
        let placements = self.placements_for(resolved, context.tile_size);
        BuiltContent::Reusable(self.factory.overlays(resolved.key, &placements))
    }

    /// Overlays belong to the image they were loaded for.
    fn on_image_selection_changed(&mut self, selection: Option<&ImageSelection>) {
        self.set_selection(selection);
        self.clear_overlays();
    }

    fn activate_overlay(&mut self, id: OverlayId, pan: Point, full_size: f64) -> Option<OverlayActivation> {
        self.activation(id, pan, full_size)
    }

    fn take_new_overlays(&mut self) -> Vec<OverlayId> {
        self.drain_fresh()
    }

    fn release(&mut self) {
        self.clear_overlays();
    }
}
