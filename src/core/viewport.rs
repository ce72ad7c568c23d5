//! The viewport: zoom level, pan position, the tile grid and the layer stack.
//!
//! Every operation runs to completion on the caller's thread. Events raised
//! along the way are queued on the [`EventBus`] and delivered before the
//! operation returns.

use crate::{
    core::{
        config::ViewerConfig,
        constants::MAX_QUERY_DEPTH,
        geo::{Motion, Point},
        grid::TileGrid,
    },
    events::{EventBus, SubscriberId, ViewerEvent},
    input::{
        events::InputEvent,
        handler::{Action, InputHandler},
    },
    layers::{
        base::{LayerId, LayerKind, LayerOptions, LayerProvider, TileContext},
        debug::DebugLayer,
        image::ImageTileLayer,
        manager::LayerStack,
        marker::MarkerLayer,
        overlay::{OverlayActivation, OverlayLayer},
    },
    prelude::Arc,
    solar::selection::ImageSelection,
    spatial::overlay::{Overlay, OverlayId},
    traits::{ContentFactory, MarkerFeed, TileContent, TileFetcher},
    Result, ViewerError,
};

pub struct Viewport<C: TileContent> {
    config: ViewerConfig,
    zoom_level: i32,
    /// Current upper zoom bound. Starts at the configured maximum and follows
    /// the selected image afterwards.
    max_zoom_level: i32,
    /// Committed pan position: where the image center sits in the viewport.
    pan: Point,
    /// Motion of the drag in progress, not yet committed.
    motion: Point,
    grid: TileGrid<C>,
    stack: LayerStack<C>,
    bus: EventBus,
    input: InputHandler,
    factory: Arc<dyn ContentFactory<C>>,
    selection: Option<ImageSelection>,
    debug_layer: Option<LayerId>,
    next_layer_id: u64,
}

impl<C: TileContent> Viewport<C> {
    /// Build a viewport from its own copy of `config`.
    pub fn new(config: ViewerConfig, factory: Arc<dyn ContentFactory<C>>) -> Result<Self> {
        config.validate()?;
        let width = config.grid.viewport_width;
        let height = config.grid.viewport_height;

        let mut viewport = Self {
            zoom_level: config.zoom.clamp(config.zoom.initial_zoom_level),
            max_zoom_level: config.zoom.max_zoom_level,
            pan: Self::middle(width, height),
            motion: Point::default(),
            grid: TileGrid::build(config.grid.tile_size_f64(), width, height),
            stack: LayerStack::new(),
            bus: EventBus::new(),
            input: InputHandler::new(config.interaction.move_throttle),
            factory,
            selection: None,
            debug_layer: None,
            next_layer_id: 0,
            config,
        };
        viewport.reposition(true);

        if viewport.config.debug_layer {
            let id = viewport.add_debug_layer(&LayerOptions::named("debug"))?;
            viewport.debug_layer = Some(id);
        }
        log::info!(
            "viewport {}x{} at zoom level {}",
            width,
            height,
            viewport.zoom_level
        );
        Ok(viewport)
    }

    fn middle(width: f64, height: f64) -> Point {
        Point::new((width / 2.0).floor(), (height / 2.0).floor())
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom_level
    }

    pub fn min_zoom_level(&self) -> i32 {
        self.config.zoom.min_zoom_level
    }

    pub fn max_zoom_level(&self) -> i32 {
        self.max_zoom_level
    }

    /// Committed pan position.
    pub fn pan_position(&self) -> Point {
        self.pan
    }

    /// Motion of the drag in progress.
    pub fn motion(&self) -> Point {
        self.motion
    }

    pub fn dimensions(&self) -> (f64, f64) {
        self.grid.dimensions()
    }

    /// Pixel size of the whole image at the current zoom level plus `offset`.
    pub fn full_size(&self, offset: i32) -> f64 {
        self.grid.tile_size() * 2_f64.powi(self.zoom_level.saturating_add(offset))
    }

    pub fn tile_context(&self) -> TileContext {
        TileContext {
            zoom_level: self.zoom_level,
            tile_size: self.grid.tile_size(),
        }
    }

    pub fn grid(&self) -> &TileGrid<C> {
        &self.grid
    }

    pub fn layers(&self) -> &LayerStack<C> {
        &self.stack
    }

    pub fn layer(&self, id: LayerId) -> Option<&dyn LayerProvider<C>> {
        self.stack.get(id)
    }

    pub fn layer_as<T: 'static>(&self, id: LayerId) -> Option<&T> {
        self.stack.get_as::<T>(id)
    }

    pub fn is_top_layer(&self, id: LayerId) -> bool {
        self.stack.is_top(id)
    }

    pub fn is_bottom_layer(&self, id: LayerId) -> bool {
        self.stack.is_bottom(id)
    }

    pub fn selection(&self) -> Option<&ImageSelection> {
        self.selection.as_ref()
    }

    pub fn debug_layer(&self) -> Option<LayerId> {
        self.debug_layer
    }

    pub fn input(&self) -> &InputHandler {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputHandler {
        &mut self.input
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: FnMut(&ViewerEvent) + 'static,
    {
        self.bus.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn clamp_zoom(&self, level: i32) -> i32 {
        level.clamp(self.config.zoom.min_zoom_level, self.max_zoom_level)
    }

    /// Change the zoom level, keeping the point under the viewport center
    /// fixed. Clamped to the zoom bounds unless `force` is set; forced levels
    /// are still limited to what tile indices can address.
    ///
    /// Returns `false` if the level did not change. `source` is not notified.
    pub fn zoom(&mut self, level: i32, source: Option<SubscriberId>, force: bool) -> bool {
        let target = if force {
            let depth = MAX_QUERY_DEPTH as i32;
            level.clamp(-depth, depth)
        } else {
            self.clamp_zoom(level)
        };
        if target == self.zoom_level {
            return false;
        }

        let (width, height) = self.grid.dimensions();
        let center = Point::new(width / 2.0, height / 2.0);
        let factor = 2_f64.powi(target.saturating_sub(self.zoom_level));
        self.pan = center.add(&self.pan.subtract(&center).multiply(factor));

        log::info!("zoom level {} -> {}", self.zoom_level, target);
        self.zoom_level = target;
        for layer in self.stack.iter_mut() {
            layer.on_zoom_level_changed(target);
        }
        self.bus.publish(ViewerEvent::ZoomChanged { zoom_level: target }, source);

        self.reposition(true);
        self.reload_all();
        self.dispatch();
        true
    }

    /// Zoom in (positive) or out (negative) by whole levels.
    pub fn zoom_by(&mut self, levels: i32, source: Option<SubscriberId>) -> bool {
        self.zoom(self.zoom_level.saturating_add(levels), source, false)
    }

    /// Move the grid by a drag motion. A motion with `stop` set is committed
    /// into the pan position.
    pub fn pan(&mut self, motion: Motion, source: Option<SubscriberId>) {
        self.motion = motion.as_point();
        self.reposition(false);
        self.bus.publish(ViewerEvent::PanMoved { motion }, source);

        if motion.stop {
            self.pan = self.pan.add(&self.motion);
            self.motion = Point::default();
            log::debug!("pan committed at {},{}", self.pan.x, self.pan.y);
        }
        self.dispatch();
    }

    /// Recompute tile positions for the current pan and motion. Tiles that
    /// wrapped get fresh content unless `position_only` is set.
    ///
    /// Returns the grid cells that wrapped.
    pub fn reposition(&mut self, position_only: bool) -> Vec<(usize, usize)> {
        let full_size = self.full_size(0);
        let wrapped = self.grid.reposition(self.pan, self.motion, full_size);
        if !position_only && !wrapped.is_empty() {
            log::debug!("{} tiles wrapped", wrapped.len());
            self.reload_cells(&wrapped);
        }
        self.refresh_debug_labels();
        wrapped
    }

    /// Rebuild the grid for a new viewport size. Returns `false` for sizes
    /// that are not positive and finite.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            log::warn!("ignoring resize to {}x{}", width, height);
            return false;
        }
        self.config.grid.viewport_width = width;
        self.config.grid.viewport_height = height;
        self.grid = TileGrid::build(self.grid.tile_size(), width, height);
        self.reposition(true);
        self.reload_all();
        true
    }

    /// Put the image center back in the middle of the viewport.
    pub fn center(&mut self) {
        let (width, height) = self.grid.dimensions();
        self.pan = Self::middle(width, height);
        self.motion = Point::default();
        self.reposition(false);
    }

    /// Change the upper zoom bound. Observers hear about it only when the
    /// value changes; the current level is pulled back inside the bound.
    pub fn set_max_zoom_level(&mut self, level: i32, source: Option<SubscriberId>) -> bool {
        let level = level.max(self.config.zoom.min_zoom_level);
        if level == self.max_zoom_level {
            return false;
        }
        self.max_zoom_level = level;
        self.bus.publish(ViewerEvent::MaxZoomChanged { max_zoom_level: level }, source);
        if self.zoom_level > level {
            self.zoom(level, None, false);
        }
        self.dispatch();
        true
    }

    /// Highest zoom level at which the whole image fits the viewport.
    pub fn optimal_zoom_level(&self) -> i32 {
        let (width, height) = self.grid.dimensions();
        let fit = (width.min(height) / self.grid.tile_size()).log2().floor();
        let level = if fit.is_finite() {
            fit as i32
        } else {
            self.config.zoom.min_zoom_level
        };
        self.clamp_zoom(level)
    }

    /// Splice content that arrived from fetchers into the grid and deliver
    /// the resulting events. Returns how many tiles arrived.
    pub fn pump(&mut self) -> usize {
        let mut arrived = 0;
        for layer in self.stack.iter_mut() {
            let id = layer.id();
            for key in layer.poll(&mut self.grid) {
                self.bus.publish(ViewerEvent::ImageTileAdded { layer: id, key }, None);
                arrived += 1;
            }
        }
        self.dispatch();
        arrived
    }

    /// Activate an overlay. Returns its information if it has any.
    pub fn activate_overlay(&mut self, layer: LayerId, overlay: OverlayId) -> Option<OverlayActivation> {
        let pan = self.pan.add(&self.motion);
        let full_size = self.full_size(0);
        let activation = self.stack.get_mut(layer)?.activate_overlay(overlay, pan, full_size)?;
        self.bus.publish(ViewerEvent::OverlayActivated(activation.clone()), None);
        self.dispatch();
        Some(activation)
    }

    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) -> Result<()> {
        let layer = self.stack.get_mut(id).ok_or(ViewerError::UnknownLayer(id))?;
        layer.set_opacity(opacity);
        let style = layer.properties().style();
        self.grid.restyle_layer(id, &style);
        Ok(())
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> Result<()> {
        let layer = self.stack.get_mut(id).ok_or(ViewerError::UnknownLayer(id))?;
        layer.set_visible(visible);
        let style = layer.properties().style();
        self.grid.restyle_layer(id, &style);
        Ok(())
    }

    /// Change one layer's resolution shift and rebuild its tiles. Returns
    /// `Ok(false)` when `offset` is not finite.
    pub fn set_layer_zoom_offset(&mut self, id: LayerId, offset: f64) -> Result<bool> {
        let layer = self.stack.get_mut(id).ok_or(ViewerError::UnknownLayer(id))?;
        if !layer.set_zoom_offset(offset) {
            return Ok(false);
        }
        self.reload_layer(id);
        Ok(true)
    }

    /// Select a new image (or none). Every layer drops its content, the zoom
    /// bound follows the image and all tiles are rebuilt.
    pub fn set_image_selection(&mut self, selection: Option<ImageSelection>, source: Option<SubscriberId>) {
        match &selection {
            Some(selection) => log::info!("image selection changed to {}", selection),
            None => log::info!("image selection cleared"),
        }
        for layer in self.stack.iter_mut() {
            layer.on_image_selection_changed(selection.as_ref());
        }
        let max_zoom_level = selection
            .as_ref()
            .map_or(self.config.zoom.max_zoom_level, |s| s.max_zoom_level);
        self.selection = selection;
        self.publish_new_overlays();

        self.set_max_zoom_level(max_zoom_level, source);
        self.reload_all();
        self.dispatch();
    }

    /// Add overlays to an overlay or marker layer.
    pub fn add_overlays(&mut self, layer: LayerId, overlays: Vec<Overlay>) -> Result<Vec<OverlayId>> {
        let ids = if let Some(target) = self.stack.get_as_mut::<OverlayLayer<C>>(layer) {
            target.add_overlays(overlays)
        } else if let Some(target) = self.stack.get_as_mut::<MarkerLayer<C>>(layer) {
            target.add_overlays(overlays)
        } else if self.stack.get(layer).is_some() {
            return Err(ViewerError::NotAnOverlayLayer(layer));
        } else {
            return Err(ViewerError::UnknownLayer(layer));
        };

        self.reload_layer(layer);
        self.publish_new_overlays();
        self.dispatch();
        Ok(ids)
    }

    /// A layer id not used by any layer added so far.
    pub fn allocate_layer_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        id
    }

    /// Put a layer on top of the stack (below the debug layer, if any) and
    /// fill every tile with its content.
    pub fn add_layer(&mut self, mut layer: Box<dyn LayerProvider<C>>) -> Result<LayerId> {
        if self.selection.is_some() {
            layer.on_image_selection_changed(self.selection.as_ref());
        }
        layer.on_zoom_level_changed(self.zoom_level);

        let id = self.stack.add(layer)?;
        self.next_layer_id = self.next_layer_id.max(id.0.saturating_add(1));
        self.reload_layer(id);
        self.publish_new_overlays();
        self.bus.publish(ViewerEvent::LayerAdded { layer: id }, None);
        self.keep_debug_on_top()?;
        self.dispatch();
        Ok(id)
    }

    pub fn add_image_layer(&mut self, options: &LayerOptions, fetcher: Box<dyn TileFetcher>) -> Result<LayerId> {
        let id = self.allocate_layer_id();
        let layer = ImageTileLayer::new(id, options, self.factory.clone(), fetcher);
        self.add_layer(Box::new(layer))
    }

    pub fn add_overlay_layer(&mut self, options: &LayerOptions) -> Result<LayerId> {
        let id = self.allocate_layer_id();
        let layer = OverlayLayer::new(id, options, self.factory.clone());
        self.add_layer(Box::new(layer))
    }

    pub fn add_marker_layer(&mut self, options: &LayerOptions, feed: Box<dyn MarkerFeed>) -> Result<LayerId> {
        let id = self.allocate_layer_id();
        let layer = MarkerLayer::new(id, options, self.factory.clone(), feed);
        self.add_layer(Box::new(layer))
    }

    pub fn add_debug_layer(&mut self, options: &LayerOptions) -> Result<LayerId> {
        let id = self.allocate_layer_id();
        let layer = DebugLayer::new(id, options, self.factory.clone());
        self.add_layer(Box::new(layer))
    }

    /// Remove a layer and its content from every tile. The layer is released
    /// and cannot be added again.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<()> {
        self.stack.remove(id)?;
        self.grid.detach_layer(id);
        if self.debug_layer == Some(id) {
            self.debug_layer = None;
        }
        self.restyle_grid();
        self.bus.publish(ViewerEvent::LayerRemoved { layer: id }, None);
        self.dispatch();
        Ok(())
    }

    /// Swap a layer with the one above it. Returns `false` at the top. A
    /// configured debug layer counts as the ceiling.
    pub fn move_layer_up(&mut self, id: LayerId) -> Result<bool> {
        if self.is_pinned(id) || self.stack.next(id)?.is_some_and(|above| self.is_pinned(above)) {
            return Ok(false);
        }
        let moved = self.stack.move_up(id)?;
        self.after_reorder(moved)?;
        Ok(moved)
    }

    /// Swap a layer with the one below it. Returns `false` at the bottom.
    pub fn move_layer_down(&mut self, id: LayerId) -> Result<bool> {
        if self.is_pinned(id) {
            self.stack.position(id).ok_or(ViewerError::UnknownLayer(id))?;
            return Ok(false);
        }
        let moved = self.stack.move_down(id)?;
        self.after_reorder(moved)?;
        Ok(moved)
    }

    /// Swap two layers. The configured debug layer does not take part and
    /// leaves the order unchanged.
    pub fn exchange_layers(&mut self, a: LayerId, b: LayerId) -> Result<()> {
        if self.is_pinned(a) || self.is_pinned(b) {
            for id in [a, b] {
                self.stack.position(id).ok_or(ViewerError::UnknownLayer(id))?;
            }
            return Ok(());
        }
        self.stack.exchange(a, b)?;
        self.after_reorder(a != b)
    }

    /// Feed raw input through the drag handler and apply the result.
    pub fn handle_input(&mut self, event: InputEvent) {
        if let Some(action) = self.input.handle_event(event) {
            self.apply(action);
        }
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Move(motion) => self.pan(motion, None),
            Action::ZoomBy(levels) => {
                self.zoom_by(levels, None);
            }
            Action::ZoomTo(level) => {
                self.zoom(level, None, false);
            }
            Action::Resize { width, height } => {
                self.resize(width, height);
            }
            Action::Center => self.center(),
            Action::Activate { layer, overlay } => {
                self.activate_overlay(layer, overlay);
            }
        }
    }

    fn is_pinned(&self, id: LayerId) -> bool {
        self.debug_layer == Some(id)
    }

    fn after_reorder(&mut self, moved: bool) -> Result<()> {
        if !moved {
            return Ok(());
        }
        self.keep_debug_on_top()?;
        self.restyle_grid();
        self.bus.publish(
            ViewerEvent::LayersReordered {
                order: self.stack.ids(),
            },
            None,
        );
        self.dispatch();
        Ok(())
    }

    fn keep_debug_on_top(&mut self) -> Result<()> {
        let Some(debug) = self.debug_layer else {
            return Ok(());
        };
        let mut moved = false;
        while self.stack.move_up(debug)? {
            moved = true;
        }
        if moved {
            self.restyle_grid();
            self.bus.publish(
                ViewerEvent::LayersReordered {
                    order: self.stack.ids(),
                },
                None,
            );
        }
        Ok(())
    }

    fn restyle_grid(&mut self) {
        for layer in self.stack.iter() {
            self.grid.restyle_layer(layer.id(), &layer.properties().style());
        }
        self.refresh_debug_labels();
    }

    /// Debug labels show tile positions and z-indices, so they are rebuilt
    /// whenever either moves.
    fn refresh_debug_labels(&mut self) {
        let context = self.tile_context();
        for layer in self.stack.iter_mut().filter(|layer| layer.kind() == LayerKind::Debug) {
            for tile in self.grid.tiles_mut() {
                layer.add_content_cached(tile, &context);
            }
        }
    }

    fn publish_new_overlays(&mut self) {
        for layer in self.stack.iter_mut() {
            let id = layer.id();
            for overlay in layer.take_new_overlays() {
                self.bus.publish(ViewerEvent::OverlayCreated { layer: id, overlay }, None);
            }
        }
    }

    fn reload_cells(&mut self, cells: &[(usize, usize)]) {
        let context = self.tile_context();
        for &(col, row) in cells {
            if let Some(tile) = self.grid.tile_mut(col, row) {
                for layer in self.stack.iter_mut() {
                    layer.add_content_cached(tile, &context);
                }
            }
        }
    }

    fn reload_all(&mut self) {
        let context = self.tile_context();
        for tile in self.grid.tiles_mut() {
            for layer in self.stack.iter_mut() {
                layer.add_content_cached(tile, &context);
            }
        }
    }

    fn reload_layer(&mut self, id: LayerId) {
        let context = self.tile_context();
        let Some(layer) = self.stack.get_mut(id) else {
            return;
        };
        for tile in self.grid.tiles_mut() {
            layer.add_content_cached(tile, &context);
        }
    }

    fn dispatch(&mut self) {
        let delivered = self.bus.flush();
        if !delivered.is_empty() {
            log::trace!("delivered {} events", delivered.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::geo::{CacheKey, TileIndex},
        layers::{
            content::{DisplayFactory, DisplayKind, DisplayTile},
            image::{FetchError, TileData, TileRequest, TileResponse},
        },
        solar::date::ImageDate,
    };
    use crossbeam_channel::Sender;
    use std::{cell::RefCell, rc::Rc};

    /// Answers every request right away.
    struct EchoFetcher;

    impl TileFetcher for EchoFetcher {
        fn fetch(&self, request: TileRequest, reply: Sender<TileResponse>) -> std::result::Result<(), FetchError> {
            let data = TileData::new(request.key.to_string(), vec![0; 4]);
            reply
                .send(request.respond(Ok(data)))
                .map_err(|err| FetchError::Unavailable(err.to_string()))
        }
    }

    /// Answers every request with a failure and remembers what was asked.
    struct FailingFetcher {
        requested: Rc<RefCell<Vec<CacheKey>>>,
    }

    impl TileFetcher for FailingFetcher {
        fn fetch(&self, request: TileRequest, reply: Sender<TileResponse>) -> std::result::Result<(), FetchError> {
            self.requested.borrow_mut().push(request.key);
            let response = request.respond(Err(FetchError::NotFound(request.key)));
            reply.send(response).map_err(|err| FetchError::Unavailable(err.to_string()))
        }
    }

    type Held = Rc<RefCell<Vec<(TileRequest, Sender<TileResponse>)>>>;

    /// Keeps requests until the test answers them.
    struct HeldFetcher(Held);

    impl TileFetcher for HeldFetcher {
        fn fetch(&self, request: TileRequest, reply: Sender<TileResponse>) -> std::result::Result<(), FetchError> {
            self.0.borrow_mut().push((request, reply));
            Ok(())
        }
    }

    fn config(width: f64, height: f64, zoom: i32) -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.grid.viewport_width = width;
        config.grid.viewport_height = height;
        config.zoom.initial_zoom_level = zoom;
        config
    }

    fn viewport(config: ViewerConfig) -> Viewport<DisplayTile> {
        Viewport::new(config, Arc::new(DisplayFactory::default())).unwrap()
    }

    fn recorder(viewport: &mut Viewport<DisplayTile>) -> (SubscriberId, Rc<RefCell<Vec<ViewerEvent>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = viewport.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        (id, seen)
    }

    fn selection() -> ImageSelection {
        let date = ImageDate::from_ymd_hms(2003, 10, 28, 12, 0, 0).unwrap();
        ImageSelection::new(date, "SOHO", "EIT", "EIT", "195")
    }

    fn image_center(viewport: &Viewport<DisplayTile>) -> Point {
        let (width, height) = viewport.dimensions();
        let full = viewport.full_size(0);
        let pan = viewport.pan_position();
        Point::new(
            (width / 2.0 - (pan.x - full / 2.0)) / full,
            (height / 2.0 - (pan.y - full / 2.0)) / full,
        )
    }

    #[test]
    fn test_new_viewport_layout() {
        let viewport = viewport(config(1024.0, 768.0, 0));
        assert_eq!(viewport.pan_position(), Point::new(512.0, 384.0));
        assert_eq!(viewport.grid().cols(), 5);
        assert_eq!(viewport.grid().rows(), 4);
        assert_eq!(viewport.full_size(0), 256.0);
        assert_eq!(viewport.full_size(2), 1024.0);
        assert!(viewport.grid().find(TileIndex::new(0, 0)).is_some());
    }

    #[test]
    fn test_full_wrap_pan_shifts_indices_by_grid_width() {
        let mut viewport = viewport(config(400.0, 400.0, 5));
        let cols = viewport.grid().cols() as i64;
        assert_eq!(cols, 3);
        let before: Vec<TileIndex> = viewport.grid().tiles().map(|t| t.index).collect();

        viewport.pan(Motion::committed(-(256.0 * 3.0 + 3.0), 0.0), None);

        let after: Vec<TileIndex> = viewport.grid().tiles().map(|t| t.index).collect();
        for (old, new) in before.iter().zip(after.iter()) {
            assert_eq!(new.x, old.x + cols);
            assert_eq!(new.y, old.y);
        }
        assert_eq!(viewport.pan_position(), Point::new(200.0 - 771.0, 200.0));
        assert_eq!(viewport.motion(), Point::default());
    }

    #[test]
    fn test_zoom_keeps_center_and_clamps() {
        let mut viewport = viewport(config(1024.0, 768.0, 0));
        let (_, seen) = recorder(&mut viewport);

        viewport.pan(Motion::committed(100.0, -40.0), None);
        let center = image_center(&viewport);

        assert!(viewport.zoom(1, None, false));
        let after = image_center(&viewport);
        assert!((after.x - center.x).abs() < 1e-12);
        assert!((after.y - center.y).abs() < 1e-12);

        assert!(viewport.zoom(99, None, false));
        assert_eq!(viewport.zoom_level(), 10);
        assert!(!viewport.zoom(10, None, false));
        assert!(viewport.zoom(12, None, true));
        assert_eq!(viewport.zoom_level(), 12);

        let zooms: Vec<i32> = seen
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ViewerEvent::ZoomChanged { zoom_level } => Some(*zoom_level),
                _ => None,
            })
            .collect();
        assert_eq!(zooms, vec![1, 10, 12]);
    }

    #[test]
    fn test_zoom_source_is_not_notified() {
        let mut viewport = viewport(config(512.0, 512.0, 0));
        let (me, seen) = recorder(&mut viewport);
        viewport.zoom_by(1, Some(me));
        assert!(seen.borrow().is_empty());
        viewport.zoom_by(1, None);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_max_zoom_change_notifies_once_and_reclamps() {
        let mut viewport = viewport(config(512.0, 512.0, 6));
        let (_, seen) = recorder(&mut viewport);

        assert!(viewport.set_max_zoom_level(4, None));
        assert!(!viewport.set_max_zoom_level(4, None));
        assert_eq!(viewport.zoom_level(), 4);

        let max_events = seen
            .borrow()
            .iter()
            .filter(|event| matches!(event, ViewerEvent::MaxZoomChanged { .. }))
            .count();
        assert_eq!(max_events, 1);
    }

    #[test]
    fn test_optimal_zoom_level() {
        assert_eq!(viewport(config(1024.0, 768.0, 0)).optimal_zoom_level(), 1);
        assert_eq!(viewport(config(100.0, 100.0, 0)).optimal_zoom_level(), 0);
    }

    #[test]
    fn test_image_tiles_arrive_through_pump() {
        let mut viewport = viewport(config(1024.0, 768.0, 0));
        let (_, seen) = recorder(&mut viewport);
        let layer = viewport
            .add_image_layer(&LayerOptions::named("EIT 195"), Box::new(EchoFetcher))
            .unwrap();
        viewport.set_image_selection(Some(selection()), None);

        let tile = viewport.grid().find(TileIndex::new(0, 0)).unwrap();
        assert_eq!(tile.content(layer).unwrap().kind, DisplayKind::Loading);

        assert_eq!(viewport.pump(), 1);
        let tile = viewport.grid().find(TileIndex::new(0, 0)).unwrap();
        assert!(matches!(tile.content(layer).unwrap().kind, DisplayKind::Image { bytes: 4, .. }));

        // Tiles outside the image stay empty.
        let outside = viewport.grid().find(TileIndex::new(1, 0)).unwrap();
        assert_eq!(outside.content(layer).unwrap().kind, DisplayKind::Empty);

        assert!(seen.borrow().contains(&ViewerEvent::ImageTileAdded {
            layer,
            key: CacheKey::new(0, 0, 0),
        }));
        assert_eq!(viewport.max_zoom_level(), 5);
    }

    #[test]
    fn test_layer_order_is_reflected_in_tiles() {
        let mut viewport = viewport(config(512.0, 512.0, 1));
        let (_, seen) = recorder(&mut viewport);
        let a = viewport.add_overlay_layer(&LayerOptions::named("a")).unwrap();
        let b = viewport.add_debug_layer(&LayerOptions::named("b")).unwrap();
        assert!(viewport.is_bottom_layer(a));
        assert!(viewport.is_top_layer(b));

        assert!(viewport.move_layer_up(a).unwrap());
        let tile = viewport.grid().tile(0, 0).unwrap();
        assert_eq!(tile.content(a).unwrap().z_index, 1);
        assert_eq!(tile.content(b).unwrap().z_index, 0);
        assert!(seen.borrow().contains(&ViewerEvent::LayersReordered { order: vec![b, a] }));

        viewport.remove_layer(b).unwrap();
        let tile = viewport.grid().tile(0, 0).unwrap();
        assert!(tile.content(b).is_none());
        assert_eq!(tile.content(a).unwrap().z_index, 0);
        assert!(matches!(viewport.remove_layer(b), Err(ViewerError::UnknownLayer(_))));
    }

    #[test]
    fn test_debug_layer_stays_on_top() {
        let mut config = config(512.0, 512.0, 0);
        config.debug_layer = true;
        let mut viewport = viewport(config);
        let debug = viewport.debug_layer().unwrap();

        let overlays = viewport.add_overlay_layer(&LayerOptions::default()).unwrap();
        assert!(viewport.is_top_layer(debug));
        assert!(viewport.is_bottom_layer(overlays));
        assert!(viewport.layers().verify_z_order().is_ok());
    }

    #[test]
    fn test_overlays_are_created_and_activated() {
        let mut viewport = viewport(config(512.0, 512.0, 0));
        let (_, seen) = recorder(&mut viewport);
        let layer = viewport.add_overlay_layer(&LayerOptions::default()).unwrap();

        let ids = viewport
            .add_overlays(layer, vec![Overlay::new("x", Point::new(0.75, 0.5)).with_info("flare")])
            .unwrap();
        assert!(seen.borrow().contains(&ViewerEvent::OverlayCreated { layer, overlay: ids[0] }));

        let tile = viewport.grid().find(TileIndex::new(0, 0)).unwrap();
        assert_eq!(tile.content(layer).unwrap().placements().len(), 1);

        let activation = viewport.activate_overlay(layer, ids[0]).unwrap();
        assert_eq!(activation.position, Point::new(256.0 + 64.0, 256.0));
        assert!(seen.borrow().contains(&ViewerEvent::OverlayActivated(activation)));

        let debug = viewport.add_debug_layer(&LayerOptions::default()).unwrap();
        assert!(matches!(
            viewport.add_overlays(debug, vec![]),
            Err(ViewerError::NotAnOverlayLayer(_))
        ));
    }

    #[test]
    fn test_opacity_and_visibility_restyle_without_rebuild() {
        let mut viewport = viewport(config(512.0, 512.0, 0));
        let layer = viewport.add_overlay_layer(&LayerOptions::default()).unwrap();
        let misses = viewport.layer(layer).unwrap().cache().stats().misses;

        viewport.set_layer_opacity(layer, 0.25).unwrap();
        viewport.set_layer_visible(layer, false).unwrap();
        for tile in viewport.grid().tiles() {
            let content = tile.content(layer).unwrap();
            assert_eq!(content.opacity, 0.25);
            assert!(!content.visible);
        }
        assert_eq!(viewport.layer(layer).unwrap().cache().stats().misses, misses);
        assert!(viewport.set_layer_opacity(LayerId(99), 0.5).is_err());
    }

    #[test]
    fn test_zoom_offset_rebuilds_one_layer() {
        let mut viewport = viewport(config(512.0, 512.0, 2));
        let a = viewport.add_overlay_layer(&LayerOptions::default()).unwrap();
        let b = viewport.add_overlay_layer(&LayerOptions::default()).unwrap();

        assert!(!viewport.set_layer_zoom_offset(a, f64::INFINITY).unwrap());
        assert!(viewport.set_layer_zoom_offset(a, 1.0).unwrap());

        let tile = viewport.grid().find(TileIndex::new(1, 1)).unwrap();
        assert_eq!(tile.slot(a).unwrap().key.zoom, 3);
        assert_eq!(tile.slot(b).unwrap().key.zoom, 2);
    }

    #[test]
    fn test_drag_through_input_handler() {
        let mut viewport = viewport(config(512.0, 512.0, 0));
        let start = viewport.pan_position();
        let (_, seen) = recorder(&mut viewport);

        viewport.handle_input(InputEvent::Press {
            position: Point::new(10.0, 10.0),
        });
        viewport.handle_input(InputEvent::Move {
            position: Point::new(20.0, 10.0),
        });
        viewport.handle_input(InputEvent::Move {
            position: Point::new(30.0, 10.0),
        });
        assert_eq!(viewport.motion(), Point::new(20.0, 0.0));
        assert_eq!(viewport.pan_position(), start);

        viewport.handle_input(InputEvent::Release {
            position: Point::new(35.0, 15.0),
        });
        assert_eq!(viewport.pan_position(), start.add(&Point::new(25.0, 5.0)));
        assert_eq!(viewport.motion(), Point::default());

        let moves = seen
            .borrow()
            .iter()
            .filter(|event| matches!(event, ViewerEvent::PanMoved { .. }))
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn test_resize_and_center() {
        let mut viewport = viewport(config(512.0, 512.0, 3));
        viewport.pan(Motion::committed(300.0, 300.0), None);
        assert!(viewport.resize(1024.0, 300.0));
        assert_eq!(viewport.grid().cols(), 5);
        assert_eq!(viewport.grid().rows(), 3);
        assert!(!viewport.resize(f64::NAN, 10.0));

        viewport.center();
        assert_eq!(viewport.pan_position(), Point::new(512.0, 150.0));
        let center = image_center(&viewport);
        assert_eq!(center, Point::new(0.5, 0.5));
    }

    fn assert_tiles_in_band(viewport: &Viewport<DisplayTile>) {
        let grid = viewport.grid();
        let lower = grid.lower_bound();
        for tile in grid.tiles() {
            assert!(tile.position.x >= lower && tile.position.x < lower + grid.span_x());
            assert!(tile.position.y >= lower && tile.position.y < lower + grid.span_y());
        }
    }

    #[test]
    fn test_forced_zoom_is_limited_to_addressable_levels() {
        let mut viewport = viewport(config(400.0, 400.0, 0));

        assert!(viewport.zoom(70, None, true));
        assert_eq!(viewport.zoom_level(), MAX_QUERY_DEPTH as i32);
        assert_tiles_in_band(&viewport);

        viewport.pan(Motion::committed(-771.0, 50.0), None);
        assert_tiles_in_band(&viewport);

        assert!(viewport.zoom(-70, None, true));
        assert_eq!(viewport.zoom_level(), -(MAX_QUERY_DEPTH as i32));
        assert_tiles_in_band(&viewport);

        assert!(viewport.zoom(0, None, true));
        assert_tiles_in_band(&viewport);
    }

    #[test]
    fn test_offset_change_drops_requests_in_flight() {
        let mut viewport = viewport(config(512.0, 512.0, 1));
        let held = Held::default();
        let layer = viewport
            .add_image_layer(&LayerOptions::default(), Box::new(HeldFetcher(held.clone())))
            .unwrap();
        viewport.set_image_selection(Some(selection()), None);

        let image = |viewport: &Viewport<DisplayTile>| {
            viewport.layer_as::<ImageTileLayer<DisplayTile>>(layer).unwrap().pending_count()
        };
        assert_eq!(image(&viewport), 4);

        assert!(viewport.set_layer_zoom_offset(layer, 1.0).unwrap());
        for (request, reply) in held.borrow_mut().drain(..) {
            let data = TileData::new(request.key.to_string(), vec![1]);
            reply.send(request.respond(Ok(data))).unwrap();
        }
        viewport.pump();

        assert_eq!(image(&viewport), 0);
        let cache = viewport.layer(layer).unwrap().cache();
        assert!(!cache.contains(&CacheKey::new(1, 0, 0)));
        assert!(cache.contains(&CacheKey::new(2, 1, 1)));
    }

    #[test]
    fn test_failed_tile_is_requested_again_after_reload() {
        let mut viewport = viewport(config(512.0, 512.0, 0));
        let requested = Rc::new(RefCell::new(Vec::new()));
        let layer = viewport
            .add_image_layer(
                &LayerOptions::default(),
                Box::new(FailingFetcher {
                    requested: requested.clone(),
                }),
            )
            .unwrap();
        let key = CacheKey::new(0, 0, 0);

        viewport.set_image_selection(Some(selection()), None);
        assert_eq!(viewport.pump(), 0);
        let tile = viewport.grid().find(TileIndex::new(0, 0)).unwrap();
        assert!(matches!(tile.content(layer).unwrap().kind, DisplayKind::Unavailable(_)));
        assert_eq!(*requested.borrow(), vec![key]);

        assert!(viewport.set_layer_zoom_offset(layer, 0.0).unwrap());
        assert_eq!(*requested.borrow(), vec![key, key]);
        let tile = viewport.grid().find(TileIndex::new(0, 0)).unwrap();
        assert_eq!(tile.content(layer).unwrap().kind, DisplayKind::Loading);

        viewport.pump();
        viewport.set_image_selection(Some(selection()), None);
        assert_eq!(*requested.borrow(), vec![key, key, key]);
    }

    #[test]
    fn test_configured_debug_layer_is_the_ceiling() {
        let mut config = config(512.0, 512.0, 0);
        config.debug_layer = true;
        let mut viewport = viewport(config);
        let debug = viewport.debug_layer().unwrap();
        let a = viewport.add_overlay_layer(&LayerOptions::named("a")).unwrap();
        let b = viewport.add_overlay_layer(&LayerOptions::named("b")).unwrap();
        assert_eq!(viewport.layers().ids(), vec![a, b, debug]);
        let (_, seen) = recorder(&mut viewport);

        assert!(!viewport.move_layer_up(b).unwrap());
        assert!(!viewport.move_layer_down(debug).unwrap());
        viewport.exchange_layers(b, debug).unwrap();
        assert_eq!(viewport.layers().ids(), vec![a, b, debug]);
        assert!(seen.borrow().is_empty());

        assert!(viewport.move_layer_up(a).unwrap());
        assert_eq!(viewport.layers().ids(), vec![b, a, debug]);
        let reorders = seen
            .borrow()
            .iter()
            .filter(|event| matches!(event, ViewerEvent::LayersReordered { .. }))
            .count();
        assert_eq!(reorders, 1);
        assert!(viewport.move_layer_up(LayerId(99)).is_err());
    }

    #[test]
    fn test_debug_labels_follow_pan_and_reorder() {
        let mut viewport = viewport(config(512.0, 512.0, 0));
        viewport.add_overlay_layer(&LayerOptions::default()).unwrap();
        let debug = viewport.add_debug_layer(&LayerOptions::default()).unwrap();

        let label = |viewport: &Viewport<DisplayTile>, col: usize, row: usize| {
            let tile = viewport.grid().tile(col, row).unwrap();
            match &tile.content(debug).unwrap().kind {
                DisplayKind::Label(label) => (label.clone(), tile.position),
                other => panic!("unexpected content {other:?}"),
            }
        };

        viewport.pan(Motion::new(10.0, 0.0), None);
        let (text, position) = label(&viewport, 0, 0);
        assert!(text.ends_with(&format!("@{},{}", position.x, position.y)));

        assert!(viewport.move_layer_down(debug).unwrap());
        let (text, _) = label(&viewport, 0, 0);
        let fields: Vec<&str> = text.split(' ').next().unwrap().split(',').collect();
        assert_eq!(fields[3], "0");
    }
}
