//! Prelude module for common heliotile types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use heliotile::prelude::*;`

pub use crate::core::{
    config::{GridConfig, InteractionConfig, ViewerConfig, ZoomConfig},
    geo::{CacheKey, Motion, Point, TileIndex},
    grid::{Tile, TileGrid},
    viewport::Viewport,
};

pub use crate::layers::{
    base::{LayerId, LayerKind, LayerOptions, LayerProperties, LayerProvider, LayerStyle, TileContext},
    cache::TileCache,
    content::{DisplayFactory, DisplayTile},
    debug::DebugLayer,
    image::{FetchError, ImageTileLayer, TileData, TileRequest, TileResponse},
    manager::LayerStack,
    marker::{InfoPopup, MarkerLayer, MarkerRecord},
    overlay::{OverlayActivation, OverlayLayer, OverlayPlacement},
};

pub use crate::events::{EventBus, SubscriberId, ViewerEvent};

pub use crate::input::{
    events::InputEvent,
    handler::{InputHandler, MoveThrottle},
};

pub use crate::solar::{
    coords::LatLon,
    date::ImageDate,
    selection::ImageSelection,
};

pub use crate::spatial::{
    overlay::{Overlay, OverlayId, OverlayScope},
    quadtree::OverlayQuadTree,
};

pub use crate::traits::{CacheStats, Cacheable, ContentFactory, MarkerFeed, TileContent, TileFetcher};

pub use crate::{Error as ViewerError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
