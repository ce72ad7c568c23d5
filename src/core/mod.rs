pub mod config;
pub mod constants;
pub mod geo;
pub mod grid;
pub mod viewport;

pub use config::ViewerConfig;
pub use geo::{CacheKey, Motion, Point, TileIndex};
pub use grid::{Tile, TileGrid};
pub use viewport::Viewport;
