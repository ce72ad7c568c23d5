use crate::{
    core::geo::Point,
    solar::{date::ImageDate, selection::ImageSelection},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an overlay in its collection's flat storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayId(pub usize);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

/// Which images an overlay is shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlayScope {
    #[default]
    AllImages,
    Instant(ImageDate),
}

impl OverlayScope {
    pub fn matches(&self, selection: Option<&ImageSelection>) -> bool {
        match self {
            OverlayScope::AllImages => true,
            OverlayScope::Instant(date) => selection.map_or(false, |s| s.date == *date),
        }
    }
}

/// A point annotation placed on the image.
///
/// `position` is in normalized image coordinates: `(0, 0)` is the top-left
/// and `(1, 1)` the bottom-right corner of the full image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub position: Point,
    /// Pixel offset of the rendered content from `position`.
    #[serde(default)]
    pub offset: Point,
    /// Unscaled width and height in pixels.
    #[serde(default)]
    pub dimensions: (f64, f64),
    /// Opaque content handed to the content factory.
    pub content: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default)]
    pub scale_when_zooming: bool,
    #[serde(default)]
    pub scope: OverlayScope,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl Overlay {
    pub fn new(content: impl Into<String>, position: Point) -> Self {
        Self {
            position,
            offset: Point::default(),
            dimensions: (0.0, 0.0),
            content: content.into(),
            info: None,
            scale_factor: default_scale_factor(),
            scale_when_zooming: false,
            scope: OverlayScope::AllImages,
        }
    }

    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_dimensions(mut self, width: f64, height: f64) -> Self {
        self.dimensions = (width, height);
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_scale(mut self, scale_factor: f64, scale_when_zooming: bool) -> Self {
        self.scale_factor = scale_factor;
        self.scale_when_zooming = scale_when_zooming;
        self
    }

    pub fn with_scope(mut self, scope: OverlayScope) -> Self {
        self.scope = scope;
        self
    }

    /// Offset after scaling. Only scaled when `scale_when_zooming` is set.
    pub fn effective_offset(&self) -> Point {
        if self.scale_when_zooming {
            self.offset.multiply(self.scale_factor)
        } else {
            self.offset
        }
    }

    pub fn effective_dimensions(&self) -> (f64, f64) {
        (
            self.dimensions.0 * self.scale_factor,
            self.dimensions.1 * self.scale_factor,
        )
    }

    /// Quadrant of the square at `(left, top)` with edge `size` that contains
    /// this overlay.
    ///
    /// ```text
    /// +---+---+
    /// | 0 | 1 |
    /// +---+---+
    /// | 2 | 3 |
    /// +---+---+
    /// ```
    pub fn quadrant(&self, left: f64, top: f64, size: f64) -> usize {
        let half = size / 2.0;
        let right = if self.position.x < left + half { 0 } else { 1 };
        let bottom = if self.position.y < top + half { 0 } else { 2 };
        right + bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_midpoint_rule() {
        let overlay = Overlay::new("a", Point::new(0.51, 0.49));
        assert_eq!(overlay.quadrant(0.0, 0.0, 1.0), 1);
        assert_eq!(overlay.quadrant(0.5, 0.0, 0.5), 2);

        let on_mid = Overlay::new("b", Point::new(0.5, 0.5));
        assert_eq!(on_mid.quadrant(0.0, 0.0, 1.0), 3);
    }

    #[test]
    fn test_scaling() {
        let overlay = Overlay::new("a", Point::new(0.5, 0.5))
            .with_offset(Point::new(-4.0, 2.0))
            .with_dimensions(10.0, 6.0)
            .with_scale(2.0, false);
        assert_eq!(overlay.effective_offset(), Point::new(-4.0, 2.0));
        assert_eq!(overlay.effective_dimensions(), (20.0, 12.0));

        let overlay = overlay.with_scale(2.0, true);
        assert_eq!(overlay.effective_offset(), Point::new(-8.0, 4.0));
    }

    #[test]
    fn test_scope() {
        let date = ImageDate::from_ymd_hms(2003, 10, 28, 0, 0, 0).unwrap();
        let other = ImageDate::from_ymd_hms(2003, 10, 29, 0, 0, 0).unwrap();
        let selection = ImageSelection::new(date, "SOHO", "EIT", "EIT", "195");

        assert!(OverlayScope::AllImages.matches(None));
        assert!(OverlayScope::Instant(date).matches(Some(&selection)));
        assert!(!OverlayScope::Instant(other).matches(Some(&selection)));
        assert!(!OverlayScope::Instant(date).matches(None));
    }
}
