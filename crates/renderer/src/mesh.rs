//! Vertex data uploaded to the GPU.

use std::sync::Arc;

use tracing::debug;

use manaburn_rhi::RhiResult;
use manaburn_rhi::buffer::{Buffer, BufferUsage};
use manaburn_rhi::device::Device;
use manaburn_rhi::vertex::Vertex;

use crate::render_object::MeshBinding;

/// A vertex buffer holding one mesh.
///
/// The buffer is written once at upload and never touched again; draws bind
/// it through a [`MeshBinding`].
pub struct GpuMesh {
    name: String,
    vertex_buffer: Buffer,
    vertex_count: u32,
}

impl GpuMesh {
    /// Copies `vertices` into a new host-visible vertex buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `vertices` is empty or the buffer cannot be
    /// created.
    pub fn upload(device: Arc<Device>, name: &str, vertices: &[Vertex]) -> RhiResult<Self> {
        let vertex_buffer =
            Buffer::new_with_data(device, BufferUsage::Vertex, bytemuck::cast_slice(vertices))?;

        debug!(
            "Uploaded mesh '{}': {} vertices ({} bytes)",
            name,
            vertices.len(),
            vertex_buffer.size()
        );

        Ok(Self {
            name: name.to_string(),
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn binding(&self) -> MeshBinding {
        MeshBinding {
            vertex_buffer: self.vertex_buffer.handle(),
            vertex_count: self.vertex_count,
        }
    }
}
