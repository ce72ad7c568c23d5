use crate::{
    core::grid::Tile,
    layers::{
        base::{BuiltContent, LayerId, LayerKind, LayerOptions, LayerProperties, LayerProvider, ResolvedTile, TileContext},
        cache::TileCache,
    },
    prelude::Arc,
    traits::{ContentFactory, TileContent},
};

/// Labels every tile with its index, zoom level, the layer's z-index, grid
/// cell and pixel position. For diagnostics only; nothing is cached.
pub struct DebugLayer<C: TileContent> {
    properties: LayerProperties,
    cache: TileCache<C>,
    factory: Arc<dyn ContentFactory<C>>,
}

impl<C: TileContent> DebugLayer<C> {
    pub fn new(id: LayerId, options: &LayerOptions, factory: Arc<dyn ContentFactory<C>>) -> Self {
        Self {
            properties: LayerProperties::new(id, LayerKind::Debug, options),
            cache: TileCache::new(),
            factory,
        }
    }

    pub fn label(&self, tile: &Tile<C>, context: &TileContext) -> String {
        format!(
            "{},{},{},{} #{},{} @{},{}",
            tile.index.x,
            tile.index.y,
            context.zoom_level,
            self.properties.z_index,
            tile.quadrant.0,
            tile.quadrant.1,
            tile.position.x,
            tile.position.y
        )
    }
}

impl<C: TileContent> LayerProvider<C> for DebugLayer<C> {
    impl_layer_trait!(C, properties, cache);

    fn create_tile_content(&mut self, resolved: &ResolvedTile, _context: &TileContext) -> BuiltContent<C> {
        BuiltContent::Transient(self.factory.debug_label(resolved.key, &resolved.key.to_string()))
    }

    fn add_content_cached(&mut self, tile: &mut Tile<C>, context: &TileContext) {
        let resolved = self.properties.resolve(tile.index, context);
        let mut content = self.factory.debug_label(resolved.key, &self.label(tile, context));
        content.apply_style(&self.properties.style());
        tile.attach(self.properties.id, resolved.key, content);
    }
}
