//! Platform abstraction layer for the engine.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Vulkan surface creation and required instance extensions
//! - Keyboard and mouse-wheel input
//! - Translation of window events into [`EngineEvent`]s

mod events;
mod input;
mod window;

pub use events::{EngineEvent, EventTranslator};
pub use input::{InputState, KeyCode};
pub use window::{Surface, Window};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::EventLoop;
