//! Per-frame input snapshot.
//!
//! The platform layer fills this from window/device events; the camera reads it
//! once per frame and the deltas are cleared afterwards.

use crate::Vec2;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,

    /// Accumulated pointer motion in pixels since the last frame (+y points down).
    pub mouse_delta: Vec2,

    /// Accumulated wheel motion in lines since the last frame (+ = away from user).
    pub scroll_delta: f32,

    /// Mouse look is applied only while the cursor is captured.
    pub look_active: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    pub fn add_scroll(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    /// Clear accumulated deltas; held keys stay as they are.
    pub fn reset_deltas(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate_until_reset() {
        let mut input = InputState::new();
        input.forward = true;
        input.add_mouse_motion(2.0, -1.0);
        input.add_mouse_motion(1.0, 3.0);
        input.add_scroll(1.0);
        assert_eq!(input.mouse_delta, Vec2::new(3.0, 2.0));
        assert_eq!(input.scroll_delta, 1.0);

        input.reset_deltas();
        assert_eq!(input.mouse_delta, Vec2::ZERO);
        assert_eq!(input.scroll_delta, 0.0);
        assert!(input.forward);
    }
}
