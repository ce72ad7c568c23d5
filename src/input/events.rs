use crate::{core::geo::Point, layers::base::LayerId, spatial::overlay::OverlayId};
use serde::{Deserialize, Serialize};

/// Raw input delivered by the embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Pointer pressed; starts a drag.
    Press { position: Point },
    /// Pointer moved. Ignored unless a drag is in progress.
    Move { position: Point },
    /// Pointer released; ends the drag.
    Release { position: Point },
    /// Zoom in (`+1`) or out (`-1`) by a number of levels.
    ZoomBy { levels: i32 },
    ZoomTo { level: i32 },
    Resize { width: f64, height: f64 },
    /// Put the image back in the middle of the viewport.
    Center,
    /// An overlay was clicked.
    Activate { layer: LayerId, overlay: OverlayId },
}

impl InputEvent {
    /// Gets the pointer position associated with this event, if any
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::Press { position } | InputEvent::Move { position } | InputEvent::Release { position } => {
                Some(*position)
            }
            _ => None,
        }
    }

    pub fn is_pointer_event(&self) -> bool {
        matches!(
            self,
            InputEvent::Press { .. } | InputEvent::Move { .. } | InputEvent::Release { .. }
        )
    }
}
