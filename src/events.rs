//! Typed notifications published by the viewport.
//!
//! Events are queued by [`EventBus::publish`] and delivered synchronously by
//! [`EventBus::flush`], to every subscriber in registration order. The
//! subscriber that caused an event can pass its own id as the source and
//! will not be told about it again.

use crate::{
    core::geo::{CacheKey, Motion},
    layers::{base::LayerId, overlay::OverlayActivation},
    spatial::overlay::OverlayId,
};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Image content for `key` arrived and was spliced into the grid.
    ImageTileAdded { layer: LayerId, key: CacheKey },
    OverlayCreated { layer: LayerId, overlay: OverlayId },
    /// An overlay with information was activated.
    OverlayActivated(OverlayActivation),
    ZoomChanged { zoom_level: i32 },
    MaxZoomChanged { max_zoom_level: i32 },
    PanMoved { motion: Motion },
    LayerAdded { layer: LayerId },
    LayerRemoved { layer: LayerId },
    /// New bottom-to-top order of the stack.
    LayersReordered { order: Vec<LayerId> },
}

impl ViewerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ViewerEvent::ImageTileAdded { .. } => "imagetileadded",
            ViewerEvent::OverlayCreated { .. } => "overlaycreated",
            ViewerEvent::OverlayActivated(_) => "overlayactivated",
            ViewerEvent::ZoomChanged { .. } => "zoomchanged",
            ViewerEvent::MaxZoomChanged { .. } => "maxzoomchanged",
            ViewerEvent::PanMoved { .. } => "panmoved",
            ViewerEvent::LayerAdded { .. } => "layeradded",
            ViewerEvent::LayerRemoved { .. } => "layerremoved",
            ViewerEvent::LayersReordered { .. } => "layersreordered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

pub type EventCallback = Box<dyn FnMut(&ViewerEvent)>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriberId, EventCallback)>,
    queue: VecDeque<(ViewerEvent, Option<SubscriberId>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: FnMut(&ViewerEvent) + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscriber, _)| *subscriber != id);
        self.subscribers.len() != before
    }

    /// Queue an event. `source` is skipped on delivery.
    pub fn publish(&mut self, event: ViewerEvent, source: Option<SubscriberId>) {
        log::trace!("queued {} event", event.name());
        self.queue.push_back((event, source));
    }

    /// Deliver every queued event and return them in publication order.
    pub fn flush(&mut self) -> Vec<ViewerEvent> {
        let mut delivered = Vec::with_capacity(self.queue.len());
        while let Some((event, source)) = self.queue.pop_front() {
            for (id, callback) in self.subscribers.iter_mut() {
                if Some(*id) != source {
                    callback(&event);
                }
            }
            delivered.push(event);
        }
        delivered
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn clear_events(&mut self) {
        self.queue.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
