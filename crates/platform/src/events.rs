//! Translation of winit window events into engine events.

use manaburn_core::Extent;
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::keyboard::PhysicalKey;

use crate::input::{InputState, KeyCode};

/// Pixel scroll distance treated as one wheel notch.
const PIXELS_PER_LINE: f64 = 20.0;

/// Events the application loop reacts to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    Quit,
    Minimized,
    Maximized,
    Restored,
    KeyDown(KeyCode),
    /// Vertical wheel motion in notches; positive away from the user.
    MouseWheel(f32),
    Resized(Extent),
}

/// Stateful translator: tracks minimize/maximize transitions and held keys
/// across events.
#[derive(Debug, Default)]
pub struct EventTranslator {
    minimized: bool,
    maximized: bool,
    input: InputState,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Translates one window event. `is_maximized` is the window's current
    /// maximize state, which winit only exposes by query.
    pub fn translate_window_event(
        &mut self,
        event: &WindowEvent,
        is_maximized: bool,
    ) -> Option<EngineEvent> {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(EngineEvent::Quit),
            WindowEvent::Resized(size) => {
                self.on_resized(Extent::new(size.width, size.height), is_maximized)
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => self.on_key(*code, *state),
            WindowEvent::MouseWheel { delta, .. } => self.on_wheel(*delta),
            _ => None,
        }
    }

    fn on_resized(&mut self, extent: Extent, is_maximized: bool) -> Option<EngineEvent> {
        if extent.is_empty() {
            if self.minimized {
                return None;
            }
            self.minimized = true;
            return Some(EngineEvent::Minimized);
        }

        if self.minimized {
            self.minimized = false;
            self.maximized = is_maximized;
            return Some(if is_maximized {
                EngineEvent::Maximized
            } else {
                EngineEvent::Restored
            });
        }

        if is_maximized != self.maximized {
            self.maximized = is_maximized;
            return Some(if is_maximized {
                EngineEvent::Maximized
            } else {
                EngineEvent::Restored
            });
        }

        Some(EngineEvent::Resized(extent))
    }

    fn on_key(&mut self, code: KeyCode, state: ElementState) -> Option<EngineEvent> {
        match state {
            ElementState::Pressed => {
                self.input.on_key_pressed(code);
                Some(EngineEvent::KeyDown(code))
            }
            ElementState::Released => {
                self.input.on_key_released(code);
                None
            }
        }
    }

    fn on_wheel(&mut self, delta: MouseScrollDelta) -> Option<EngineEvent> {
        let notches = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
        };
        if notches == 0.0 {
            return None;
        }
        self.input.on_scroll(notches);
        Some(EngineEvent::MouseWheel(notches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::{PhysicalPosition, PhysicalSize};

    fn resized(width: u32, height: u32) -> WindowEvent {
        WindowEvent::Resized(PhysicalSize::new(width, height))
    }

    #[test]
    fn test_close_requested_is_quit() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate_window_event(&WindowEvent::CloseRequested, false),
            Some(EngineEvent::Quit)
        );
    }

    #[test]
    fn test_zero_size_is_minimized_once() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate_window_event(&resized(0, 0), false),
            Some(EngineEvent::Minimized)
        );
        assert!(translator.is_minimized());
        assert_eq!(translator.translate_window_event(&resized(0, 0), false), None);
    }

    #[test]
    fn test_restore_after_minimize() {
        let mut translator = EventTranslator::new();
        translator.translate_window_event(&resized(0, 0), false);
        assert_eq!(
            translator.translate_window_event(&resized(1200, 600), false),
            Some(EngineEvent::Restored)
        );
        assert!(!translator.is_minimized());
    }

    #[test]
    fn test_maximize_transitions() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate_window_event(&resized(1920, 1080), true),
            Some(EngineEvent::Maximized)
        );
        assert_eq!(
            translator.translate_window_event(&resized(1200, 600), false),
            Some(EngineEvent::Restored)
        );
    }

    #[test]
    fn test_plain_resize() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate_window_event(&resized(800, 600), false),
            Some(EngineEvent::Resized(Extent::new(800, 600)))
        );
    }

    #[test]
    fn test_key_down_tracks_held_keys() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.on_key(KeyCode::KeyA, ElementState::Pressed),
            Some(EngineEvent::KeyDown(KeyCode::KeyA))
        );
        assert!(translator.input_mut().is_key_pressed(KeyCode::KeyA));

        assert_eq!(translator.on_key(KeyCode::KeyA, ElementState::Released), None);
        assert!(!translator.input_mut().is_key_pressed(KeyCode::KeyA));
    }

    #[test]
    fn test_wheel_line_delta() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.on_wheel(MouseScrollDelta::LineDelta(0.0, -1.0)),
            Some(EngineEvent::MouseWheel(-1.0))
        );
        assert_eq!(translator.input_mut().scroll_delta(), -1.0);
    }

    #[test]
    fn test_wheel_pixel_delta_scaled_to_notches() {
        let mut translator = EventTranslator::new();
        let event = translator.on_wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(
            0.0, 40.0,
        )));
        assert_eq!(event, Some(EngineEvent::MouseWheel(2.0)));
    }

    #[test]
    fn test_horizontal_only_wheel_ignored() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.on_wheel(MouseScrollDelta::LineDelta(1.0, 0.0)),
            None
        );
    }
}
