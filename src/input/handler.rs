use crate::{
    core::geo::{Motion, Point},
    input::events::InputEvent,
    layers::base::LayerId,
    spatial::overlay::OverlayId,
};

/// What the viewport should do in response to input.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the grid. Committed into the pan position when `stop` is set.
    Move(Motion),
    ZoomBy(i32),
    ZoomTo(i32),
    Resize { width: f64, height: f64 },
    Center,
    Activate { layer: LayerId, overlay: OverlayId },
}

/// Lets through only every n-th pointer move of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveThrottle {
    every: u32,
    count: u32,
}

impl MoveThrottle {
    /// `every` below 1 is treated as 1 (no throttling).
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            count: 0,
        }
    }

    /// Count one move and report whether it should be applied.
    pub fn tick(&mut self) -> bool {
        self.count = (self.count + 1) % self.every;
        self.count == 0
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn every(&self) -> u32 {
        self.every
    }
}

/// Turns raw input into viewport actions.
///
/// A drag reports its motion relative to where the pointer was pressed, so
/// dropped moves lose nothing: the next applied move carries the full
/// displacement. The release always produces a committed motion.
#[derive(Debug, Clone)]
pub struct InputHandler {
    pub enabled: bool,
    throttle: MoveThrottle,
    drag_origin: Option<Point>,
}

impl InputHandler {
    pub fn new(move_throttle: u32) -> Self {
        Self {
            enabled: true,
            throttle: MoveThrottle::new(move_throttle),
            drag_origin: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    pub fn handle_event(&mut self, event: InputEvent) -> Option<Action> {
        if !self.enabled {
            return None;
        }

        match event {
            InputEvent::Press { position } => {
                self.drag_origin = Some(position);
                self.throttle.reset();
                None
            }
            InputEvent::Move { position } => {
                let origin = self.drag_origin?;
                if !self.throttle.tick() {
                    return None;
                }
                let delta = position.subtract(&origin);
                Some(Action::Move(Motion::new(delta.x, delta.y)))
            }
            InputEvent::Release { position } => {
                let origin = self.drag_origin.take()?;
                self.throttle.reset();
                let delta = position.subtract(&origin);
                Some(Action::Move(Motion::committed(delta.x, delta.y)))
            }
            InputEvent::ZoomBy { levels } => Some(Action::ZoomBy(levels)),
            InputEvent::ZoomTo { level } => Some(Action::ZoomTo(level)),
            InputEvent::Resize { width, height } => Some(Action::Resize { width, height }),
            InputEvent::Center => Some(Action::Center),
            InputEvent::Activate { layer, overlay } => Some(Action::Activate { layer, overlay }),
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new(crate::core::constants::DEFAULT_MOVE_THROTTLE)
    }
}
