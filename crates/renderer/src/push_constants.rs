//! Per-draw push constant block.
//!
//! Must match the `constants` block in `tri_mesh.vert` exactly. The struct is
//! `#[repr(C)]` and `Pod` so it can be uploaded as raw bytes.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Push constants for the mesh pipeline.
///
/// # Memory Layout
///
/// - Offset 0: data vector (16 bytes, unused padding)
/// - Offset 16: render matrix, `projection * view * model` (64 bytes)
/// - Total size: 80 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshPushConstants {
    pub data: Vec4,
    pub render_matrix: Mat4,
}

impl MeshPushConstants {
    /// Size of the struct in bytes.
    pub const SIZE: u32 = std::mem::size_of::<Self>() as u32;

    pub fn new(render_matrix: Mat4) -> Self {
        Self {
            data: Vec4::ZERO,
            render_matrix,
        }
    }
}
