use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a point in screen, pixel or normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    pub fn round(&self) -> Point {
        Point::new(self.x.round(), self.y.round())
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Position of a tile in the unbounded integer grid of one zoom level.
///
/// Indices are not reduced modulo the number of tiles per row: wrapping
/// shifts them by whole grid widths so differences between indices stay
/// meaningful within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: i64,
    pub y: i64,
}

impl TileIndex {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Key of one rendered tile inside a layer's cache.
///
/// All three components are already resolved for the layer, i.e. the layer's
/// zoom offset and index offset have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub zoom: i32,
    pub x: i64,
    pub y: i64,
}

impl CacheKey {
    pub fn new(zoom: i32, x: i64, y: i64) -> Self {
        Self { zoom, x, y }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A drag displacement in viewport pixels, measured from where the drag
/// started. Content follows the pointer, so a positive `x` moves the image
/// to the right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Motion {
    pub x: f64,
    pub y: f64,
    /// The drag was released; the motion is committed into the pan position.
    pub stop: bool,
}

impl Motion {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, stop: false }
    }

    pub fn committed(x: f64, y: f64) -> Self {
        Self { x, y, stop: true }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn as_point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Number of tiles along one row of a full image at `zoom`.
///
/// At negative zoom levels the whole image fits a single, shrunken tile.
pub fn tiles_per_row(zoom: i32) -> Option<i64> {
    if zoom <= 0 {
        return Some(1);
    }
    1_i64.checked_shl(zoom as u32).filter(|count| *count > 0)
}
