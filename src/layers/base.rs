use crate::{
    core::{
        geo::{CacheKey, Point, TileIndex},
        grid::{Tile, TileGrid},
    },
    layers::{cache::TileCache, overlay::OverlayActivation},
    solar::selection::ImageSelection,
    spatial::overlay::OverlayId,
    traits::TileContent,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a layer, unique within one viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Image,
    Overlay,
    Marker,
    Debug,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Image => write!(f, "image"),
            LayerKind::Overlay => write!(f, "overlay"),
            LayerKind::Marker => write!(f, "marker"),
            LayerKind::Debug => write!(f, "debug"),
        }
    }
}

/// Display properties applied to content without rebuilding it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    pub opacity: f32,
    pub z_index: usize,
    pub visible: bool,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            z_index: 0,
            visible: true,
        }
    }
}

/// User facing options of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerOptions {
    pub name: String,
    pub opacity: f32,
    /// Resolution shift relative to the viewport zoom level. Rounded to an
    /// integer; non-finite values are ignored.
    pub zoom_offset: f64,
    pub visible: bool,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            opacity: 1.0,
            zoom_offset: 0.0,
            visible: true,
        }
    }
}

impl LayerOptions {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_zoom_offset(mut self, zoom_offset: f64) -> Self {
        self.zoom_offset = zoom_offset;
        self
    }
}

/// State every layer kind shares.
#[derive(Debug, Clone)]
pub struct LayerProperties {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    /// Position in the stack. Kept unique and contiguous by the stack.
    pub z_index: usize,
    pub opacity: f32,
    pub visible: bool,
    pub zoom_offset: i32,
}

impl LayerProperties {
    pub fn new(id: LayerId, kind: LayerKind, options: &LayerOptions) -> Self {
        let name = if options.name.is_empty() {
            format!("{kind} {}", id.0)
        } else {
            options.name.clone()
        };
        Self {
            id,
            name,
            kind,
            z_index: 0,
            opacity: options.opacity.clamp(0.0, 1.0),
            visible: options.visible,
            zoom_offset: if options.zoom_offset.is_finite() {
                options.zoom_offset.round() as i32
            } else {
                0
            },
        }
    }

    pub fn style(&self) -> LayerStyle {
        LayerStyle {
            opacity: self.opacity,
            z_index: self.z_index,
            visible: self.visible,
        }
    }

    /// Map a grid tile to the tile of this layer that covers it.
    ///
    /// A zoom offset changes how many layer tiles span the image. The layer
    /// is kept centered on the base grid, which shifts its indices by
    /// `2^(zoom-1) * (1 - 2^offset)` tiles; the fractional part of that shift
    /// becomes a pixel offset.
    pub fn resolve(&self, index: TileIndex, context: &TileContext) -> ResolvedTile {
        let zoom = context.zoom_level.saturating_add(self.zoom_offset);
        let index_offset = 2_f64.powi(context.zoom_level.saturating_sub(1)) * (1.0 - 2_f64.powi(self.zoom_offset));
        let whole = index_offset.floor();
        let fraction = index_offset - whole;
        let shift = whole as i64;

        ResolvedTile {
            key: CacheKey::new(zoom, index.x.saturating_sub(shift), index.y.saturating_sub(shift)),
            tile_offset: context.tile_size * fraction,
        }
    }
}

/// Viewport state a layer needs to build content. Passed explicitly on every
/// call; layers never read it from anywhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileContext {
    pub zoom_level: i32,
    pub tile_size: f64,
}

/// A grid tile translated into one layer's own tile space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTile {
    pub key: CacheKey,
    /// Sub-tile pixel shift so differently resolved layers line up.
    pub tile_offset: f64,
}

/// Outcome of building content for one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltContent<C> {
    /// Final content; cached and reused until the cache is cleared.
    Reusable(C),
    /// A placeholder that must be rebuilt next time.
    Transient(C),
}

impl<C> BuiltContent<C> {
    pub fn into_inner(self) -> C {
        match self {
            BuiltContent::Reusable(content) | BuiltContent::Transient(content) => content,
        }
    }
}

/// A layer in the stack: produces content for the tiles of the grid.
///
/// The accessors are usually generated with [`impl_layer_trait!`].
pub trait LayerProvider<C: TileContent> {
    fn id(&self) -> LayerId;
    fn name(&self) -> &str;
    fn kind(&self) -> LayerKind;
    fn properties(&self) -> &LayerProperties;
    fn properties_mut(&mut self) -> &mut LayerProperties;
    fn cache(&self) -> &TileCache<C>;
    fn cache_mut(&mut self) -> &mut TileCache<C>;
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    /// Build content for `resolved`. Must not touch the cache.
    fn create_tile_content(&mut self, resolved: &ResolvedTile, context: &TileContext) -> BuiltContent<C>;

    fn z_index(&self) -> usize {
        self.properties().z_index
    }

    fn set_z_index(&mut self, z_index: usize) {
        self.properties_mut().z_index = z_index;
        let style = self.properties().style();
        self.cache_mut().restyle(&style);
    }

    fn opacity(&self) -> f32 {
        self.properties().opacity
    }

    fn is_visible(&self) -> bool {
        self.properties().visible
    }

    fn zoom_offset(&self) -> i32 {
        self.properties().zoom_offset
    }

    /// Attach this layer's content for `tile`, reusing cached content.
    fn add_content_cached(&mut self, tile: &mut Tile<C>, context: &TileContext) {
        let resolved = self.properties().resolve(tile.index, context);
        let style = self.properties().style();

        let content = match self.cache_mut().lookup(&resolved.key) {
            Some(content) => content,
            None => match self.create_tile_content(&resolved, context) {
                BuiltContent::Reusable(mut content) => {
                    content.apply_style(&style);
                    self.cache_mut().insert(resolved.key, content.clone());
                    content
                }
                BuiltContent::Transient(mut content) => {
                    content.apply_style(&style);
                    content
                }
            },
        };
        tile.attach(self.id(), resolved.key, content);
    }

    /// Change opacity of every cached tile. The cache stays valid.
    fn set_opacity(&mut self, opacity: f32) {
        self.properties_mut().opacity = opacity.clamp(0.0, 1.0);
        let style = self.properties().style();
        self.cache_mut().restyle(&style);
    }

    fn set_visible(&mut self, visible: bool) {
        self.properties_mut().visible = visible;
        let style = self.properties().style();
        self.cache_mut().restyle(&style);
    }

    /// Change the resolution shift. Returns `false` and does nothing when
    /// `offset` is not finite; otherwise clears the cache so every tile is
    /// rebuilt.
    fn set_zoom_offset(&mut self, offset: f64) -> bool {
        if !offset.is_finite() {
            log::debug!("{}: ignoring non-finite zoom offset {}", self.id(), offset);
            return false;
        }
        self.properties_mut().zoom_offset = offset.round() as i32;
        self.cache_mut().clear();
        true
    }

    /// A new image was selected. Clears the cache.
    fn on_image_selection_changed(&mut self, _selection: Option<&ImageSelection>) {
        self.cache_mut().clear();
    }

    fn on_zoom_level_changed(&mut self, _zoom_level: i32) {}

    /// Splice content that arrived since the last call into `grid`.
    /// Returns the keys whose image content arrived.
    fn poll(&mut self, _grid: &mut TileGrid<C>) -> Vec<CacheKey> {
        Vec::new()
    }

    /// Information to show for an activated overlay. Layers without
    /// overlays return `None`.
    fn activate_overlay(&mut self, _id: OverlayId, _pan: Point, _full_size: f64) -> Option<OverlayActivation> {
        None
    }

    /// Overlays created since the last call.
    fn take_new_overlays(&mut self) -> Vec<OverlayId> {
        Vec::new()
    }

    /// Drop everything before the layer leaves the stack.
    fn release(&mut self) {
        self.cache_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(zoom_level: i32) -> TileContext {
        TileContext {
            zoom_level,
            tile_size: 256.0,
        }
    }

    #[test]
    fn test_layer_properties() {
        let props = LayerProperties::new(LayerId(3), LayerKind::Overlay, &LayerOptions::default());
        assert_eq!(props.name, "overlay 3");
        assert_eq!(props.z_index, 0);
        assert_eq!(props.opacity, 1.0);
        assert!(props.visible);

        let options = LayerOptions::named("EIT 195").with_opacity(1.7).with_zoom_offset(f64::NAN);
        let props = LayerProperties::new(LayerId(4), LayerKind::Image, &options);
        assert_eq!(props.name, "EIT 195");
        assert_eq!(props.opacity, 1.0);
        assert_eq!(props.zoom_offset, 0);
    }

    #[test]
    fn test_resolve_without_offset_is_identity() {
        let props = LayerProperties::new(LayerId(1), LayerKind::Image, &LayerOptions::default());
        let resolved = props.resolve(TileIndex::new(5, -2), &context(4));
        assert_eq!(resolved.key, CacheKey::new(4, 5, -2));
        assert_eq!(resolved.tile_offset, 0.0);
    }

    #[test]
    fn test_resolve_with_offset_keeps_center() {
        // One level finer: the center tile (8 at zoom 4) maps to 16 at zoom 5.
        let options = LayerOptions::default().with_zoom_offset(1.0);
        let props = LayerProperties::new(LayerId(1), LayerKind::Image, &options);
        let resolved = props.resolve(TileIndex::new(8, 8), &context(4));
        assert_eq!(resolved.key, CacheKey::new(5, 16, 16));
        assert_eq!(resolved.tile_offset, 0.0);

        // At zoom 0 the shift is half a tile.
        let resolved = props.resolve(TileIndex::new(0, 0), &context(0));
        assert_eq!(resolved.key, CacheKey::new(1, 1, 1));
        assert_eq!(resolved.tile_offset, 128.0);
    }

    #[test]
    fn test_layer_kind_display() {
        assert_eq!(LayerKind::Image.to_string(), "image");
        assert_eq!(LayerKind::Marker.to_string(), "marker");
        assert_eq!(LayerId(7).to_string(), "layer#7");
    }
}
