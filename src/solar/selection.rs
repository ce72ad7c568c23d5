use crate::{
    core::{
        constants::DEFAULT_SUN_CENTER,
        geo::{tiles_per_row, Point},
    },
    solar::date::ImageDate,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes the image currently selected for display.
///
/// Delivered by the application whenever the user picks another image; the
/// engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSelection {
    pub date: ImageDate,
    pub observatory: String,
    pub instrument: String,
    pub detector: String,
    pub measurement: String,
    /// Opaque reference the fetcher resolves tiles against.
    pub tile_base: String,
    /// Solar radius as a fraction of the full image size.
    #[serde(default = "default_sun_radius")]
    pub sun_radius: f64,
    #[serde(default = "default_sun_center")]
    pub sun_center: Point,
    /// Deepest zoom level the instrument has tiles for.
    #[serde(default = "default_max_zoom_level")]
    pub max_zoom_level: i32,
}

fn default_sun_radius() -> f64 {
    0.233
}

fn default_sun_center() -> Point {
    Point::new(DEFAULT_SUN_CENTER.0, DEFAULT_SUN_CENTER.1)
}

fn default_max_zoom_level() -> i32 {
    5
}

impl ImageSelection {
    pub fn new(date: ImageDate, observatory: &str, instrument: &str, detector: &str, measurement: &str) -> Self {
        Self {
            date,
            observatory: observatory.to_string(),
            instrument: instrument.to_string(),
            detector: detector.to_string(),
            measurement: measurement.to_string(),
            tile_base: String::new(),
            sun_radius: default_sun_radius(),
            sun_center: default_sun_center(),
            max_zoom_level: default_max_zoom_level(),
        }
    }

    pub fn with_tile_base(mut self, tile_base: &str) -> Self {
        self.tile_base = tile_base.to_string();
        self
    }

    pub fn with_sun(mut self, sun_radius: f64, sun_center: Point) -> Self {
        self.sun_radius = sun_radius;
        self.sun_center = sun_center;
        self
    }

    pub fn with_max_zoom_level(mut self, max_zoom_level: i32) -> Self {
        self.max_zoom_level = max_zoom_level;
        self
    }

    /// Whether the instrument has a tile at `(x, y)` on `zoom`.
    pub fn has_tile(&self, zoom: i32, x: i64, y: i64) -> bool {
        if zoom > self.max_zoom_level {
            return false;
        }
        match tiles_per_row(zoom) {
            Some(count) => (0..count).contains(&x) && (0..count).contains(&y),
            None => false,
        }
    }
}

impl fmt::Display for ImageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}/{}/{}",
            self.date, self.observatory, self.instrument, self.detector, self.measurement
        )
    }
}
