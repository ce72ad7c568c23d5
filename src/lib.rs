//! # heliotile
//!
//! A tiled-viewport engine for panning and zooming across very large
//! mosaics of solar observation images.
//!
//! The visible area is covered by a fixed grid of tiles that wrap around as
//! the user pans. Each tile carries one content slot per stacked layer:
//! image tiles, positioned overlays (markers, labels) or a debug grid.
//! Overlays are projected from heliographic latitude/longitude onto the
//! image and indexed in a lazily split quad-tree so each tile only looks at
//! the overlays that intersect it.

pub mod core;
pub mod events;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod solar;
pub mod spatial;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::ViewerConfig,
    geo::{CacheKey, Motion, Point, TileIndex},
    grid::{Tile, TileGrid},
    viewport::Viewport,
};

pub use layers::{
    base::{LayerId, LayerKind, LayerOptions, LayerProvider},
    cache::TileCache,
    content::{DisplayFactory, DisplayTile},
    debug::DebugLayer,
    image::ImageTileLayer,
    manager::LayerStack,
    marker::MarkerLayer,
    overlay::OverlayLayer,
};

pub use events::{EventBus, SubscriberId, ViewerEvent};

pub use input::{events::InputEvent, handler::InputHandler};

pub use solar::{coords::LatLon, date::ImageDate, selection::ImageSelection};

pub use spatial::{overlay::Overlay, quadtree::OverlayQuadTree};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// A trigonometric inverse was fed a value outside its domain by more
    /// than the rounding tolerance. Marker data upstream is wrong.
    #[error("numerical domain error in {operation}: {value}")]
    NumericalDomain { operation: &'static str, value: f64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid marker record: {0}")]
    InvalidMarker(String),

    #[error("Unknown layer: {0}")]
    UnknownLayer(layers::base::LayerId),

    #[error("{0} does not hold overlays")]
    NotAnOverlayLayer(layers::base::LayerId),

    /// A structural invariant of the engine no longer holds. This is a bug,
    /// never an input problem, and callers must not try to recover from it.
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Error type alias for convenience
pub type Error = ViewerError;

/// Initialise `env_logger` for binaries and tests that want log output.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
