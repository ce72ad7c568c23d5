//! Seams between the engine and the application embedding it.
//!
//! The engine never renders anything itself. It asks a [`ContentFactory`]
//! for opaque [`TileContent`] values, fetches tile imagery through a
//! [`TileFetcher`], and pulls marker records from a [`MarkerFeed`].

use crate::{
    core::geo::CacheKey,
    layers::{
        base::LayerStyle,
        image::{FetchError, TileData, TileRequest, TileResponse},
        marker::MarkerRecord,
        overlay::OverlayPlacement,
    },
    solar::selection::ImageSelection,
};
use crossbeam_channel::Sender;
use std::fmt;

/// Rendered content of one layer on one tile.
///
/// Values are cloned freely: once into the layer's cache, once into the tile
/// slot. Implementations backed by a real surface usually wrap a handle.
pub trait TileContent: Clone + fmt::Debug + 'static {
    /// Apply display properties without rebuilding the content.
    fn apply_style(&mut self, style: &LayerStyle);
}

/// Produces tile content for the layer kinds the engine knows about.
pub trait ContentFactory<C> {
    /// Nothing to show, e.g. a tile outside the image.
    fn empty(&self, key: CacheKey) -> C;

    /// Placeholder while a fetch is in flight.
    fn loading(&self, key: CacheKey) -> C;

    fn image(&self, key: CacheKey, data: &TileData) -> C;

    /// Placeholder for content that will not arrive.
    fn unavailable(&self, key: CacheKey) -> C;

    fn overlays(&self, key: CacheKey, placements: &[OverlayPlacement]) -> C;

    fn debug_label(&self, key: CacheKey, label: &str) -> C;
}

/// Fetches tile imagery asynchronously.
///
/// `fetch` must not block. The response goes to `reply` whenever it is
/// ready, possibly from another thread, possibly after the tile has moved
/// on. An `Err` means the request could not even be issued.
pub trait TileFetcher {
    fn fetch(&self, request: TileRequest, reply: Sender<TileResponse>) -> Result<(), FetchError>;
}

/// Source of already parsed marker records for an image.
pub trait MarkerFeed {
    fn markers_for(&self, selection: &ImageSelection) -> Vec<MarkerRecord>;
}

/// Trait for cacheable operations
pub trait Cacheable {
    type Key: Clone + Eq + std::hash::Hash;
    type Value: Clone;

    /// Look up a value, counting the hit or miss.
    fn get_cached(&mut self, key: &Self::Key) -> Option<Self::Value>;

    fn cache(&mut self, key: Self::Key, value: Self::Value);

    fn invalidate(&mut self, key: &Self::Key);

    fn clear_cache(&mut self);

    fn cache_stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}
