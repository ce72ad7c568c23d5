use crate::{
    layers::base::{LayerId, LayerProvider},
    traits::TileContent,
    Result, ViewerError,
};

/// Ordered stack of layers, bottom first.
///
/// A layer's z-index is always its position in the stack, so z-indices stay
/// unique and contiguous from 0 after every operation.
pub struct LayerStack<C: TileContent> {
    layers: Vec<Box<dyn LayerProvider<C>>>,
}

impl<C: TileContent> Default for LayerStack<C> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<C: TileContent> LayerStack<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a layer on top of the stack.
    pub fn add(&mut self, mut layer: Box<dyn LayerProvider<C>>) -> Result<LayerId> {
        let id = layer.id();
        if self.position(id).is_some() {
            return Err(ViewerError::Invariant(format!("{id} is already in the stack")));
        }
        layer.set_z_index(self.layers.len());
        log::info!("adding {} layer {} ({}) at z {}", layer.kind(), id, layer.name(), layer.z_index());
        self.layers.push(layer);
        self.verify_z_order()?;
        Ok(id)
    }

    /// Take a layer out of the stack. Layers above it move down by one.
    pub fn remove(&mut self, id: LayerId) -> Result<Box<dyn LayerProvider<C>>> {
        let index = self.position(id).ok_or(ViewerError::UnknownLayer(id))?;
        let mut layer = self.layers.remove(index);
        layer.release();
        for (z, above) in self.layers.iter_mut().enumerate().skip(index) {
            above.set_z_index(z);
        }
        log::info!("removed layer {}", id);
        self.verify_z_order()?;
        Ok(layer)
    }

    /// Swap two layers' positions and z-indices.
    pub fn exchange(&mut self, a: LayerId, b: LayerId) -> Result<()> {
        let ia = self.position(a).ok_or(ViewerError::UnknownLayer(a))?;
        let ib = self.position(b).ok_or(ViewerError::UnknownLayer(b))?;
        if ia == ib {
            return Ok(());
        }
        self.layers.swap(ia, ib);
        self.layers[ia].set_z_index(ia);
        self.layers[ib].set_z_index(ib);
        log::debug!("exchanged {} and {}", a, b);
        self.verify_z_order()
    }

    /// Swap with the layer above. Returns `false` if already on top.
    pub fn move_up(&mut self, id: LayerId) -> Result<bool> {
        match self.next(id)? {
            Some(above) => self.exchange(id, above).map(|_| true),
            None => Ok(false),
        }
    }

    /// Swap with the layer below. Returns `false` if already at the bottom.
    pub fn move_down(&mut self, id: LayerId) -> Result<bool> {
        match self.previous(id)? {
            Some(below) => self.exchange(id, below).map(|_| true),
            None => Ok(false),
        }
    }

    /// The layer directly above `id`.
    pub fn next(&self, id: LayerId) -> Result<Option<LayerId>> {
        let index = self.position(id).ok_or(ViewerError::UnknownLayer(id))?;
        Ok(self.layers.get(index + 1).map(|layer| layer.id()))
    }

    /// The layer directly below `id`.
    pub fn previous(&self, id: LayerId) -> Result<Option<LayerId>> {
        let index = self.position(id).ok_or(ViewerError::UnknownLayer(id))?;
        Ok(index.checked_sub(1).map(|below| self.layers[below].id()))
    }

    pub fn is_top(&self, id: LayerId) -> bool {
        self.layers.last().map_or(false, |layer| layer.id() == id)
    }

    pub fn is_bottom(&self, id: LayerId) -> bool {
        self.layers.first().map_or(false, |layer| layer.id() == id)
    }

    pub fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }

    pub fn get(&self, id: LayerId) -> Option<&dyn LayerProvider<C>> {
        self.layers.iter().find(|layer| layer.id() == id).map(|layer| layer.as_ref())
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut (dyn LayerProvider<C> + 'static)> {
        self.layers.iter_mut().find(|layer| layer.id() == id).map(|layer| layer.as_mut())
    }

    /// Downcast a layer to its concrete type.
    pub fn get_as<T: 'static>(&self, id: LayerId) -> Option<&T> {
        self.get(id).and_then(|layer| layer.as_any().downcast_ref::<T>())
    }

    pub fn get_as_mut<T: 'static>(&mut self, id: LayerId) -> Option<&mut T> {
        self.get_mut(id).and_then(|layer| layer.as_any_mut().downcast_mut::<T>())
    }

    /// Layers bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &dyn LayerProvider<C>> {
        self.layers.iter().map(|layer| layer.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn LayerProvider<C>>> {
        self.layers.iter_mut()
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|layer| layer.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Check that every layer's z-index equals its position.
    pub fn verify_z_order(&self) -> Result<()> {
        for (position, layer) in self.layers.iter().enumerate() {
            if layer.z_index() != position {
                return Err(ViewerError::Invariant(format!(
                    "{} has z-index {} at position {}",
                    layer.id(),
                    layer.z_index(),
                    position
                )));
            }
        }
        Ok(())
    }
}
