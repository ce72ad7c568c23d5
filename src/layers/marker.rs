//! Marker layer: overlays built from heliographic marker records.
//!
//! Records give a position on the sun at 0:00 UTC of the observation day.
//! Each one is corrected for differential rotation up to the image's time of
//! day, tilted by the date's obliquity and projected onto the image. Markers
//! that rotated behind the disk are dropped.

use crate::{
    core::geo::Point,
    layers::{
        base::{BuiltContent, LayerId, LayerKind, LayerOptions, LayerProperties, LayerProvider, ResolvedTile, TileContext},
        cache::TileCache,
        overlay::{OverlayActivation, OverlayLayer},
    },
    prelude::Arc,
    solar::{coords::LatLon, selection::ImageSelection},
    spatial::overlay::{Overlay, OverlayId, OverlayScope},
    traits::{ContentFactory, MarkerFeed, TileContent},
    Result, ViewerError,
};
use serde::{Deserialize, Serialize};

/// One already parsed record of a marker feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub region_id: String,
    /// Heliographic position such as `N13W62`.
    pub location: String,
    /// Extra fields shown in the info popup, in order.
    #[serde(default)]
    pub fields: Vec<(String, String)>,
}

impl MarkerRecord {
    pub fn new(region_id: &str, location: &str) -> Self {
        Self {
            region_id: region_id.to_string(),
            location: location.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    /// Latitude and longitude in degrees. South and west are positive.
    pub fn position_degrees(&self) -> Result<(f64, f64)> {
        parse_location(&self.location)
    }

    fn info(&self) -> String {
        let mut info = format!(
            "Region {}\nLocation (at 0:00): {}",
            self.region_id, self.location
        );
        for (name, value) in &self.fields {
            info.push_str(&format!("\n{name}: {value}"));
        }
        info
    }

    /// Convert to an overlay on `selection`. `Ok(None)` if the marker is on
    /// the far side of the sun at the image's time.
    pub fn to_overlay(&self, selection: &ImageSelection) -> Result<Option<Overlay>> {
        let (latitude, longitude) = self.position_degrees()?;
        let latitude = latitude.to_radians();
        let delta = selection.date.rotation_delta_longitude(latitude);

        let mut position = LatLon::new(latitude, longitude.to_radians() + delta);
        if position.adjust_obliquity(&selection.date)? {
            return Ok(None);
        }

        let xy = position.to_xy(selection.sun_radius, selection.sun_center);
        Ok(Some(
            Overlay::new(self.region_id.clone(), xy)
                .with_info(self.info())
                .with_scope(OverlayScope::Instant(selection.date)),
        ))
    }
}

/// Parse `N13W62`-style positions into signed degrees.
fn parse_location(location: &str) -> Result<(f64, f64)> {
    let invalid = || ViewerError::InvalidMarker(format!("bad location {location:?}"));

    let bytes = location.trim().as_bytes();
    if bytes.len() != 6 {
        return Err(invalid());
    }
    let degrees = |digits: &[u8]| -> Option<f64> {
        if digits.iter().all(u8::is_ascii_digit) {
            Some(((digits[0] - b'0') * 10 + (digits[1] - b'0')) as f64)
        } else {
            None
        }
    };

    let latitude_sign = match bytes[0].to_ascii_uppercase() {
        b'S' => 1.0,
        b'N' => -1.0,
        _ => return Err(invalid()),
    };
    let longitude_sign = match bytes[3].to_ascii_uppercase() {
        b'W' => 1.0,
        b'E' => -1.0,
        _ => return Err(invalid()),
    };
    let latitude = degrees(&bytes[1..3]).ok_or_else(invalid)?;
    let longitude = degrees(&bytes[4..6]).ok_or_else(invalid)?;

    Ok((latitude * latitude_sign, longitude * longitude_sign))
}

/// Overlays for `records`, plus the records that could not be converted.
/// Markers behind the disk are neither.
pub fn convert_markers(
    records: &[MarkerRecord],
    selection: &ImageSelection,
) -> (Vec<Overlay>, Vec<(String, ViewerError)>) {
    let mut overlays = Vec::new();
    let mut rejected = Vec::new();
    for record in records {
        match record.to_overlay(selection) {
            Ok(Some(overlay)) => overlays.push(overlay),
            Ok(None) => log::debug!("marker {} is behind the disk", record.region_id),
            Err(err) => {
                log::warn!("rejecting marker {}: {}", record.region_id, err);
                rejected.push((record.region_id.clone(), err));
            }
        }
    }
    (overlays, rejected)
}

/// Popup showing an activated marker's information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoPopup {
    visible: bool,
    overlay: Option<OverlayId>,
    info: String,
    position: Point,
}

impl InfoPopup {
    pub fn show(&mut self, activation: &OverlayActivation) {
        self.visible = true;
        self.overlay = Some(activation.overlay);
        self.info = activation.info.clone();
        self.position = activation.position;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn overlay(&self) -> Option<OverlayId> {
        self.overlay
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn position(&self) -> Point {
        self.position
    }
}

/// Overlay layer fed by a [`MarkerFeed`].
pub struct MarkerLayer<C: TileContent> {
    overlays: OverlayLayer<C>,
    feed: Box<dyn MarkerFeed>,
    popup: InfoPopup,
    rejected: Vec<(String, ViewerError)>,
}

impl<C: TileContent> MarkerLayer<C> {
    pub fn new(
        id: LayerId,
        options: &LayerOptions,
        factory: Arc<dyn ContentFactory<C>>,
        feed: Box<dyn MarkerFeed>,
    ) -> Self {
        Self {
            overlays: OverlayLayer::with_kind(id, LayerKind::Marker, options, factory),
            feed,
            popup: InfoPopup::default(),
            rejected: Vec::new(),
        }
    }

    pub fn popup(&self) -> &InfoPopup {
        &self.popup
    }

    pub fn overlay_layer(&self) -> &OverlayLayer<C> {
        &self.overlays
    }

    /// Add overlays next to the ones loaded from the feed.
    pub fn add_overlays<I: IntoIterator<Item = Overlay>>(&mut self, overlays: I) -> Vec<OverlayId> {
        self.overlays.add_overlays(overlays)
    }

    /// Records rejected by the last load, with the reason.
    pub fn rejected(&self) -> &[(String, ViewerError)] {
        &self.rejected
    }

    fn load_markers(&mut self, selection: &ImageSelection) {
        let records = self.feed.markers_for(selection);
        let (overlays, rejected) = convert_markers(&records, selection);
        log::info!(
            "{}: {} markers for {} ({} rejected)",
            self.overlays.properties().id,
            overlays.len(),
            selection,
            rejected.len()
        );
        self.overlays.add_overlays(overlays);
        self.rejected = rejected;
    }
}

impl<C: TileContent> LayerProvider<C> for MarkerLayer<C> {
    fn id(&self) -> LayerId {
        self.overlays.id()
    }

    fn name(&self) -> &str {
        self.overlays.name()
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Marker
    }

    fn properties(&self) -> &LayerProperties {
        self.overlays.properties()
    }

    fn properties_mut(&mut self) -> &mut LayerProperties {
        self.overlays.properties_mut()
    }

    fn cache(&self) -> &TileCache<C> {
        self.overlays.cache()
    }

    fn cache_mut(&mut self) -> &mut TileCache<C> {
        self.overlays.cache_mut()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn create_tile_content(&mut self, resolved: &ResolvedTile, context: &TileContext) -> BuiltContent<C> {
        self.overlays.create_tile_content(resolved, context)
    }

    fn on_image_selection_changed(&mut self, selection: Option<&ImageSelection>) {
        self.popup.hide();
        self.rejected.clear();
        self.overlays.on_image_selection_changed(selection);
        if let Some(selection) = selection {
            self.load_markers(selection);
        }
    }

    fn on_zoom_level_changed(&mut self, _zoom_level: i32) {
        self.popup.hide();
    }

    fn activate_overlay(&mut self, id: OverlayId, pan: Point, full_size: f64) -> Option<OverlayActivation> {
        let activation = self.overlays.activation(id, pan, full_size)?;
        self.popup.show(&activation);
        Some(activation)
    }

    fn take_new_overlays(&mut self) -> Vec<OverlayId> {
        self.overlays.take_new_overlays()
    }

    fn release(&mut self) {
        self.popup.hide();
        self.overlays.release();
    }
}
