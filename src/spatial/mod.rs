//! Overlay records and the quad-tree that finds them per tile.

pub mod overlay;
pub mod quadtree;

pub use overlay::{Overlay, OverlayId, OverlayScope};
pub use quadtree::OverlayQuadTree;
