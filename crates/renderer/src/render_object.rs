//! Drawable objects.
//!
//! A [`RenderObject`] refers to its mesh and material by handle; it owns no
//! GPU memory. The [`GpuMesh`](crate::mesh::GpuMesh) and
//! [`Material`](crate::material::Material) behind those handles are owned
//! once by the renderer and freed at teardown.

use ash::vk;
use glam::Mat4;

/// Non-owning view of an uploaded mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshBinding {
    pub vertex_buffer: vk::Buffer,
    pub vertex_count: u32,
}

/// Non-owning view of a built material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialBinding {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

/// One drawable entry in the scene list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderObject {
    pub mesh: MeshBinding,
    pub material: MaterialBinding,
    pub transform: Mat4,
}

impl RenderObject {
    pub fn new(mesh: MeshBinding, material: MaterialBinding, transform: Mat4) -> Self {
        Self {
            mesh,
            material,
            transform,
        }
    }

    /// Identity comparison: two objects share a mesh when they reference the
    /// same vertex buffer.
    #[inline]
    pub fn shares_mesh(&self, mesh: &MeshBinding) -> bool {
        self.mesh.vertex_buffer == mesh.vertex_buffer
    }

    /// Identity comparison on the pipeline handle.
    #[inline]
    pub fn shares_material(&self, material: &MaterialBinding) -> bool {
        self.material.pipeline == material.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn mesh(raw: u64, count: u32) -> MeshBinding {
        MeshBinding {
            vertex_buffer: vk::Buffer::from_raw(raw),
            vertex_count: count,
        }
    }

    fn material(raw: u64) -> MaterialBinding {
        MaterialBinding {
            pipeline: vk::Pipeline::from_raw(raw),
            layout: vk::PipelineLayout::from_raw(raw + 100),
        }
    }

    #[test]
    fn test_identity_is_by_handle() {
        let object = RenderObject::new(mesh(1, 3), material(7), Mat4::IDENTITY);

        assert!(object.shares_mesh(&mesh(1, 999)));
        assert!(!object.shares_mesh(&mesh(2, 3)));
        assert!(object.shares_material(&material(7)));
        assert!(!object.shares_material(&material(8)));
    }
}
