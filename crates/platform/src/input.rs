//! Keyboard and mouse-wheel input state.

use std::collections::HashSet;

pub use winit::keyboard::KeyCode;

/// Keys currently held and wheel motion accumulated since the last frame.
#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-frame accumulators.
    pub fn begin_frame(&mut self) {
        self.scroll_delta = 0.0;
    }

    /// Records a key press. Returns `true` for a fresh press, `false` for an
    /// auto-repeat of a key already held.
    pub fn on_key_pressed(&mut self, key: KeyCode) -> bool {
        self.pressed_keys.insert(key)
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn on_scroll(&mut self, delta: f32) {
        self.scroll_delta += delta;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }
}
