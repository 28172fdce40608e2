//! Scene-side state that feeds the renderer.
//!
//! The engine keeps no scene graph: the camera is a plain translation and
//! render objects carry their own model matrices.

pub mod camera;

pub use camera::{Camera, Projection};
