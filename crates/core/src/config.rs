//! Engine configuration.
//!
//! Everything that used to be a process-wide toggle (validation layers,
//! extension lists, timeouts, asset paths) lives in one immutable
//! [`EngineConfig`] built at startup and passed by reference.

use std::ffi::CStr;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A window or surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (minimized window).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Immutable engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    application_name: String,
    window_title: String,
    window_extent: Extent,
    enable_validation: bool,
    validation_layers: Vec<&'static CStr>,
    device_extensions: Vec<&'static CStr>,
    frame_timeout_ns: u64,
    acquire_timeout_ns: u64,
    asset_root: PathBuf,
    vertex_shader: PathBuf,
    fragment_shader: PathBuf,
    mesh_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_name: "Manaburn".to_string(),
            window_title: "Manaburn".to_string(),
            window_extent: Extent::new(1200, 600),
            enable_validation: cfg!(debug_assertions),
            validation_layers: vec![c"VK_LAYER_KHRONOS_validation"],
            device_extensions: vec![c"VK_KHR_swapchain", c"VK_KHR_synchronization2"],
            frame_timeout_ns: 100_000_000,
            acquire_timeout_ns: 1_000_000_000,
            asset_root: PathBuf::from("."),
            vertex_shader: PathBuf::from("shaders/tri_mesh.vert.spv"),
            fragment_shader: PathBuf::from("shaders/colored_triangle.frag.spv"),
            mesh_path: PathBuf::from("assets/monkey_smooth.obj"),
        }
    }
}

impl EngineConfig {
    pub fn with_window_extent(mut self, width: u32, height: u32) -> Self {
        self.window_extent = Extent::new(width, height);
        self
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    pub fn with_validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    pub fn with_frame_timeout_ns(mut self, timeout: u64) -> Self {
        self.frame_timeout_ns = timeout;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_device_extensions(mut self, extensions: Vec<&'static CStr>) -> Self {
        self.device_extensions = extensions;
        self
    }

    /// Check the configuration for values the engine cannot start with.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for a zero window extent, an empty device
    /// extension list, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.window_extent.is_empty() {
            return Err(Error::Config(format!(
                "window extent must be non-zero, got {}x{}",
                self.window_extent.width, self.window_extent.height
            )));
        }
        if self.device_extensions.is_empty() {
            return Err(Error::Config(
                "at least one device extension is required".to_string(),
            ));
        }
        if self.frame_timeout_ns == 0 || self.acquire_timeout_ns == 0 {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn window_extent(&self) -> Extent {
        self.window_extent
    }

    pub fn enable_validation(&self) -> bool {
        self.enable_validation
    }

    pub fn validation_layers(&self) -> &[&'static CStr] {
        &self.validation_layers
    }

    pub fn device_extensions(&self) -> &[&'static CStr] {
        &self.device_extensions
    }

    /// Bound on the per-slot fence wait. Expiry is fatal.
    pub fn frame_timeout_ns(&self) -> u64 {
        self.frame_timeout_ns
    }

    pub fn acquire_timeout_ns(&self) -> u64 {
        self.acquire_timeout_ns
    }

    pub fn vertex_shader_path(&self) -> PathBuf {
        self.resolve(&self.vertex_shader)
    }

    pub fn fragment_shader_path(&self) -> PathBuf {
        self.resolve(&self.fragment_shader)
    }

    pub fn mesh_path(&self) -> PathBuf {
        self.resolve(&self.mesh_path)
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        self.asset_root.join(relative)
    }
}
