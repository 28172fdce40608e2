//! Materials: a graphics pipeline and the layout it was built against.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use manaburn_core::EngineConfig;
use manaburn_rhi::RhiResult;
use manaburn_rhi::device::Device;
use manaburn_rhi::pipeline::{
    CompareOp, CullMode, FrontFace, GraphicsPipelineBuilder, Pipeline, PipelineLayout, PolygonMode,
};
use manaburn_rhi::shader::{Shader, ShaderStage};
use manaburn_rhi::vertex::Vertex;

use crate::push_constants::MeshPushConstants;
use crate::render_object::MaterialBinding;

/// Push constant range of the mesh pipeline: one vertex-stage block at
/// offset 0.
pub fn mesh_push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX,
        offset: 0,
        size: MeshPushConstants::SIZE,
    }
}

/// Owns a pipeline and its layout.
///
/// Fields drop in declaration order, so the pipeline goes before the layout.
pub struct Material {
    name: String,
    pipeline: Pipeline,
    layout: PipelineLayout,
}

impl Material {
    /// Builds the mesh material used by the default scene.
    ///
    /// Shaders are read from the paths in `config`; the shader modules are
    /// released as soon as the pipeline exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader file is missing or invalid, or if the
    /// layout or pipeline cannot be created.
    pub fn mesh_material(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        config: &EngineConfig,
    ) -> RhiResult<Self> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &config.vertex_shader_path(),
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &config.fragment_shader_path(),
            ShaderStage::Fragment,
        )?;

        let layout = PipelineLayout::new(device.clone(), &[mesh_push_constant_range()])?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .polygon_mode(PolygonMode::Fill)
            .cull_mode(CullMode::None)
            .front_face(FrontFace::Clockwise)
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(CompareOp::LessOrEqual)
            .render_pass(render_pass)
            .build(device, &layout)?;

        info!("Mesh material created");

        Ok(Self {
            name: "defaultmesh".to_string(),
            pipeline,
            layout,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> MaterialBinding {
        MaterialBinding {
            pipeline: self.pipeline.handle(),
            layout: self.layout.handle(),
        }
    }
}
