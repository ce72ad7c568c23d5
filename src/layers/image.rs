//! Image tiles of the selected observation.
//!
//! Content is fetched asynchronously. A tile shows a loading placeholder
//! until its response is drained by [`LayerProvider::poll`], which splices
//! the image into every grid tile still showing that key.

use crate::{
    core::{geo::CacheKey, grid::TileGrid},
    layers::{
        base::{BuiltContent, LayerId, LayerKind, LayerOptions, LayerProperties, LayerProvider, ResolvedTile, TileContext},
        cache::TileCache,
    },
    prelude::{Arc, HashMap},
    solar::selection::ImageSelection,
    traits::{ContentFactory, TileContent, TileFetcher},
};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Why tile data could not be delivered. Becomes a placeholder, never an
/// error the caller sees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("tile {0} not found")]
    NotFound(CacheKey),

    #[error("fetching tile {key} failed: {reason}")]
    Failed { key: CacheKey, reason: String },

    #[error("fetcher unavailable: {0}")]
    Unavailable(String),
}

/// Raw tile payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    /// Where the data came from, for display and logging.
    pub reference: String,
    pub bytes: Vec<u8>,
}

impl TileData {
    pub fn new(reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            reference: reference.into(),
            bytes,
        }
    }
}

/// A request for one tile of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub key: CacheKey,
    /// Cache generation the request was issued in.
    pub generation: u64,
    pub selection: ImageSelection,
}

impl TileRequest {
    /// Build the response for this request, carrying its tags along.
    pub fn respond(&self, result: Result<TileData, FetchError>) -> TileResponse {
        TileResponse {
            key: self.key,
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileResponse {
    pub key: CacheKey,
    pub generation: u64,
    pub result: Result<TileData, FetchError>,
}

/// Layer showing the tiles of the selected image.
pub struct ImageTileLayer<C: TileContent> {
    properties: LayerProperties,
    cache: TileCache<C>,
    factory: Arc<dyn ContentFactory<C>>,
    fetcher: Box<dyn TileFetcher>,
    selection: Option<ImageSelection>,
    /// Keys with a request in flight, and the generation it was issued in.
    pending: HashMap<CacheKey, u64>,
    sender: Sender<TileResponse>,
    receiver: Receiver<TileResponse>,
}

impl<C: TileContent> ImageTileLayer<C> {
    pub fn new(
        id: LayerId,
        options: &LayerOptions,
        factory: Arc<dyn ContentFactory<C>>,
        fetcher: Box<dyn TileFetcher>,
    ) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            properties: LayerProperties::new(id, LayerKind::Image, options),
            cache: TileCache::new(),
            factory,
            fetcher,
            selection: None,
            pending: HashMap::default(),
            sender,
            receiver,
        }
    }

    pub fn selection(&self) -> Option<&ImageSelection> {
        self.selection.as_ref()
    }

    /// Requests in flight for the current generation.
    pub fn pending_count(&self) -> usize {
        let generation = self.cache.generation();
        self.pending.values().filter(|issued| **issued == generation).count()
    }

    fn is_current(&self, response: &TileResponse) -> bool {
        response.generation == self.cache.generation()
            && self.pending.get(&response.key) == Some(&response.generation)
    }
}

impl<C: TileContent> LayerProvider<C> for ImageTileLayer<C> {
    impl_layer_trait!(C, properties, cache);

    fn create_tile_content(&mut self, resolved: &ResolvedTile, _context: &TileContext) -> BuiltContent<C> {
        let key = resolved.key;
        let selection = match &self.selection {
            Some(selection) => selection,
            None => return BuiltContent::Reusable(self.factory.empty(key)),
        };
        if !selection.has_tile(key.zoom, key.x, key.y) {
            return BuiltContent::Reusable(self.factory.empty(key));
        }

        let generation = self.cache.generation();
        if self.pending.get(&key) == Some(&generation) {
            return BuiltContent::Transient(self.factory.loading(key));
        }

        let request = TileRequest {
            key,
            generation,
            selection: selection.clone(),
        };
        match self.fetcher.fetch(request, self.sender.clone()) {
            Ok(()) => {
                self.pending.insert(key, generation);
                BuiltContent::Transient(self.factory.loading(key))
            }
            Err(err) => {
                log::warn!("{}: could not request tile {}: {}", self.properties.id, key, err);
                BuiltContent::Transient(self.factory.unavailable(key))
            }
        }
    }

    fn on_image_selection_changed(&mut self, selection: Option<&ImageSelection>) {
        if let Some(selection) = selection {
            log::info!("{}: showing {}", self.properties.id, selection);
        }
        self.selection = selection.cloned();
        self.pending.clear();
        self.cache.clear();
    }

    fn poll(&mut self, grid: &mut TileGrid<C>) -> Vec<CacheKey> {
        // Requests from before the last clear are never waited on again.
        let generation = self.cache.generation();
        self.pending.retain(|_, issued| *issued == generation);

        let mut arrived = Vec::new();
        while let Ok(response) = self.receiver.try_recv() {
            if !self.is_current(&response) {
                log::debug!(
                    "{}: discarding stale response for {} (generation {})",
                    self.properties.id,
                    response.key,
                    response.generation
                );
                continue;
            }
            self.pending.remove(&response.key);

            let key = response.key;
            let style = self.properties.style();
            let content = match response.result {
                Ok(data) => {
                    let mut content = self.factory.image(key, &data);
                    content.apply_style(&style);
                    self.cache.insert(key, content.clone());
                    arrived.push(key);
                    content
                }
                Err(err) => {
                    // Not cached, so the next reload asks again.
                    log::warn!("{}: tile {} unavailable: {}", self.properties.id, key, err);
                    let mut content = self.factory.unavailable(key);
                    content.apply_style(&style);
                    content
                }
            };
            let spliced = grid.splice(self.properties.id, key, &content);
            log::debug!("{}: tile {} spliced into {} grid tiles", self.properties.id, key, spliced);
        }
        arrived
    }

    fn release(&mut self) {
        self.pending.clear();
        self.cache.clear();
    }
}
