use crate::{
    core::geo::CacheKey,
    layers::base::LayerStyle,
    prelude::HashMap,
    traits::{CacheStats, Cacheable, TileContent},
};

/// Per-layer cache of rendered tiles keyed by `(zoom, x, y)`.
///
/// Entries are never evicted: once built, content is reused verbatim until
/// the whole cache is cleared. Each clear starts a new generation so late
/// fetch responses for the previous one can be recognised.
#[derive(Debug, Clone)]
pub struct TileCache<C> {
    entries: HashMap<CacheKey, C>,
    generation: u64,
    hits: u64,
    misses: u64,
}

impl<C> Default for TileCache<C> {
    fn default() -> Self {
        Self {
            entries: HashMap::default(),
            generation: 0,
            hits: 0,
            misses: 0,
        }
    }
}

impl<C: TileContent> TileCache<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, counting the hit or miss.
    pub fn lookup(&mut self, key: &CacheKey) -> Option<C> {
        match self.entries.get(key) {
            Some(content) => {
                self.hits += 1;
                log::trace!("cache hit {}", key);
                Some(content.clone())
            }
            None => {
                self.misses += 1;
                log::trace!("cache miss {}", key);
                None
            }
        }
    }

    /// Peek without touching the statistics.
    pub fn get(&self, key: &CacheKey) -> Option<&C> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: CacheKey, content: C) {
        self.entries.insert(key, content);
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<C> {
        self.entries.remove(key)
    }

    /// Apply `style` to every cached entry. Nothing is invalidated.
    pub fn restyle(&mut self, style: &LayerStyle) {
        for content in self.entries.values_mut() {
            content.apply_style(style);
        }
    }

    /// Drop every entry and start a new generation.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("clearing {} cached tiles", self.entries.len());
        }
        self.entries.clear();
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
        }
    }
}

impl<C: TileContent> Cacheable for TileCache<C> {
    type Key = CacheKey;
    type Value = C;

    fn get_cached(&mut self, key: &Self::Key) -> Option<Self::Value> {
        self.lookup(key)
    }

    fn cache(&mut self, key: Self::Key, value: Self::Value) {
        self.insert(key, value);
    }

    fn invalidate(&mut self, key: &Self::Key) {
        self.remove(key);
    }

    fn clear_cache(&mut self) {
        self.clear();
    }

    fn cache_stats(&self) -> CacheStats {
        self.stats()
    }
}
