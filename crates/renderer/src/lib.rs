//! Frame lifecycle and scene rendering.
//!
//! This crate orchestrates the rendering process:
//! - Frame slots and the per-frame CPU/GPU ordering protocol
//! - Deferred release of resources still referenced by in-flight frames
//! - Swapchain targets and their rebuild on resize
//! - Scene draw submission with redundant-bind elision

pub mod deletion_queue;
pub mod draw;
pub mod error;
pub mod frame;
pub mod material;
pub mod mesh;
pub mod push_constants;
pub mod render_object;
pub mod renderer;
pub mod swapchain_manager;
pub mod synchronizer;

pub use deletion_queue::DeletionQueue;
pub use draw::{DrawRecorder, PassTarget, draw_objects, record_scene_pass};
pub use error::{RendererError, RendererResult};
pub use frame::{FramePool, FrameSlot, release_slot, slot_index};
pub use material::Material;
pub use mesh::GpuMesh;
pub use push_constants::MeshPushConstants;
pub use render_object::{MaterialBinding, MeshBinding, RenderObject};
pub use renderer::Renderer;
pub use swapchain_manager::{SwapchainManager, SwapchainTargets};
pub use synchronizer::{FrameBackend, FrameOutcome, FrameSynchronizer};

/// Maximum number of frames that can be in flight simultaneously.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
