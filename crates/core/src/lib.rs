//! Core utilities shared by every manaburn crate.
//!
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Immutable engine configuration

mod config;
mod error;
mod logging;
mod timer;

pub use config::{EngineConfig, Extent};
pub use error::{Error, Result};
pub use logging::{DEFAULT_FILTER, init_logging};
pub use timer::FrameTimer;
