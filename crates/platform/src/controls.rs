//! Keyboard mapping onto [`InputState`] plus a small FPS counter.

use corelib::InputState;
use winit::keyboard::KeyCode;

/// Window-level effect of a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Exit,
    ToggleCapture,
}

/// WASD moves, Space/Shift go up/down, Esc exits, Tab toggles mouse capture.
pub fn apply_key(input: &mut InputState, code: KeyCode, pressed: bool, repeat: bool) -> KeyAction {
    match code {
        KeyCode::KeyW => input.forward = pressed,
        KeyCode::KeyS => input.backward = pressed,
        KeyCode::KeyA => input.left = pressed,
        KeyCode::KeyD => input.right = pressed,
        KeyCode::Space => input.up = pressed,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => input.down = pressed,
        KeyCode::Escape if pressed => return KeyAction::Exit,
        KeyCode::Tab if pressed && !repeat => return KeyAction::ToggleCapture,
        _ => {}
    }
    KeyAction::None
}

/// Averages frame time over half-second windows.
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    elapsed: f32,
    fps: f32,
}

impl FpsCounter {
    const WINDOW_SECS: f32 = 0.5;

    /// Returns the new average when a window completes.
    pub fn tick(&mut self, dt: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < Self::WINDOW_SECS {
            return None;
        }
        self.fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(self.fps)
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_follow_press_and_release() {
        let mut input = InputState::new();
        assert_eq!(apply_key(&mut input, KeyCode::KeyW, true, false), KeyAction::None);
        apply_key(&mut input, KeyCode::ShiftLeft, true, false);
        assert!(input.forward && input.down);

        apply_key(&mut input, KeyCode::KeyW, false, false);
        assert!(!input.forward);
        assert!(input.down);
    }

    #[test]
    fn escape_and_tab_trigger_actions_on_press_only() {
        let mut input = InputState::new();
        assert_eq!(apply_key(&mut input, KeyCode::Escape, true, false), KeyAction::Exit);
        assert_eq!(apply_key(&mut input, KeyCode::Escape, false, false), KeyAction::None);
        assert_eq!(apply_key(&mut input, KeyCode::Tab, true, false), KeyAction::ToggleCapture);
        assert_eq!(apply_key(&mut input, KeyCode::Tab, true, true), KeyAction::None);
        assert_eq!(input, InputState::new());
    }

    #[test]
    fn fps_reported_per_half_second() {
        let mut fps = FpsCounter::default();
        // 1/64 s is exact in binary, so 32 frames make exactly half a second.
        for _ in 0..31 {
            assert_eq!(fps.tick(1.0 / 64.0), None);
        }
        let avg = fps.tick(1.0 / 64.0).expect("window complete");
        assert_eq!(avg, 64.0);
        assert_eq!(fps.fps(), avg);
    }
}
