use glam::Vec2;

/// A camera gesture, independent of the windowing backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Orbit around the target by a pointer delta in pixels.
    Rotate(Vec2),
    /// Slide the target by a pointer delta in pixels.
    Pan(Vec2),
    /// Move toward (positive) or away from (negative) the target, in wheel steps.
    Dolly(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Tracks the pointer between events and turns drags into actions.
#[derive(Debug, Default, Clone)]
pub struct PointerState {
    position: Option<Vec2>,
    dragging: Option<PointerButton>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_button(&mut self, button: PointerButton, pressed: bool) {
        if pressed {
            self.dragging.get_or_insert(button);
        } else if self.dragging == Some(button) {
            self.dragging = None;
        }
    }

    /// Record a new pointer position. Returns the drag action, if any.
    pub fn on_moved(&mut self, position: Vec2) -> Option<Action> {
        let last = self.position.replace(position)?;
        let delta = position - last;
        if delta == Vec2::ZERO {
            return None;
        }
        match self.dragging? {
            PointerButton::Primary => Some(Action::Rotate(delta)),
            PointerButton::Secondary | PointerButton::Middle => Some(Action::Pan(delta)),
        }
    }

    pub fn on_wheel(&mut self, steps: f32) -> Option<Action> {
        (steps != 0.0 && steps.is_finite()).then_some(Action::Dolly(steps))
    }

    /// Forget the last position, e.g. when the pointer leaves the window.
    pub fn on_left(&mut self) {
        self.position = None;
        self.dragging = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }
}
