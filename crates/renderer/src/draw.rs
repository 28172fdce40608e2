//! Scene draw submission.
//!
//! [`record_scene_pass`] writes one render pass that draws every
//! [`RenderObject`] in order. Pipeline and vertex buffer binds are skipped
//! when the object uses the same material or mesh as the previous one;
//! identity is the Vulkan handle. This only saves command overhead, the
//! rendered result is the same either way.

use ash::vk;
use glam::Mat4;

use manaburn_rhi::command::CommandBuffer;

use crate::push_constants::MeshPushConstants;
use crate::render_object::{MaterialBinding, MeshBinding, RenderObject};

/// The subset of command recording used by scene submission.
pub trait DrawRecorder {
    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
    );

    fn set_viewport_scissor(&mut self, extent: vk::Extent2D);

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);

    fn push_constants(&mut self, layout: vk::PipelineLayout, constants: &MeshPushConstants);

    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    fn end_render_pass(&mut self);
}

impl DrawRecorder for CommandBuffer {
    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
    ) {
        CommandBuffer::begin_render_pass(self, render_pass, framebuffer, extent);
    }

    fn set_viewport_scissor(&mut self, extent: vk::Extent2D) {
        CommandBuffer::set_viewport_scissor(self, extent);
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        CommandBuffer::bind_pipeline(self, pipeline);
    }

    fn push_constants(&mut self, layout: vk::PipelineLayout, constants: &MeshPushConstants) {
        CommandBuffer::push_constants(self, layout, constants);
    }

    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) {
        CommandBuffer::bind_vertex_buffer(self, buffer);
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        CommandBuffer::draw(self, vertex_count, instance_count, first_vertex, first_instance);
    }

    fn end_render_pass(&mut self) {
        CommandBuffer::end_render_pass(self);
    }
}

/// Where a scene pass renders to.
#[derive(Clone, Copy, Debug)]
pub struct PassTarget {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
}

/// Draws `objects` inside an already-open render pass.
///
/// Returns the number of draw calls issued.
pub fn draw_objects<R: DrawRecorder>(
    recorder: &mut R,
    view_projection: Mat4,
    objects: &[RenderObject],
) -> usize {
    let mut last_material: Option<MaterialBinding> = None;
    let mut last_mesh: Option<MeshBinding> = None;

    for object in objects {
        if !last_material.is_some_and(|m| object.shares_material(&m)) {
            recorder.bind_pipeline(object.material.pipeline);
            last_material = Some(object.material);
        }

        let constants = MeshPushConstants::new(view_projection * object.transform);
        recorder.push_constants(object.material.layout, &constants);

        if !last_mesh.is_some_and(|m| object.shares_mesh(&m)) {
            recorder.bind_vertex_buffer(object.mesh.vertex_buffer);
            last_mesh = Some(object.mesh);
        }

        recorder.draw(object.mesh.vertex_count, 1, 0, 0);
    }

    objects.len()
}

/// Records a full scene pass: begin with clears, dynamic state, every
/// object, end.
///
/// An empty `objects` slice still yields a valid pass that only clears.
pub fn record_scene_pass<R: DrawRecorder>(
    recorder: &mut R,
    target: PassTarget,
    view_projection: Mat4,
    objects: &[RenderObject],
) -> usize {
    recorder.begin_render_pass(target.render_pass, target.framebuffer, target.extent);
    recorder.set_viewport_scissor(target.extent);
    let draws = draw_objects(recorder, view_projection, objects);
    recorder.end_render_pass();
    draws
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use glam::Vec3;

    #[derive(Debug, Clone, PartialEq)]
    enum Cmd {
        BeginPass,
        Viewport,
        BindPipeline(u64),
        Push(Mat4),
        BindVertexBuffer(u64),
        Draw(u32, u32),
        EndPass,
    }

    #[derive(Default)]
    struct MockRecorder {
        commands: Vec<Cmd>,
    }

    impl MockRecorder {
        fn count(&self, pred: impl Fn(&Cmd) -> bool) -> usize {
            self.commands.iter().filter(|c| pred(c)).count()
        }

        fn pipeline_binds(&self) -> usize {
            self.count(|c| matches!(c, Cmd::BindPipeline(_)))
        }

        fn vertex_binds(&self) -> usize {
            self.count(|c| matches!(c, Cmd::BindVertexBuffer(_)))
        }

        fn draws(&self) -> usize {
            self.count(|c| matches!(c, Cmd::Draw(..)))
        }
    }

    impl DrawRecorder for MockRecorder {
        fn begin_render_pass(&mut self, _: vk::RenderPass, _: vk::Framebuffer, _: vk::Extent2D) {
            self.commands.push(Cmd::BeginPass);
        }

        fn set_viewport_scissor(&mut self, _: vk::Extent2D) {
            self.commands.push(Cmd::Viewport);
        }

        fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
            self.commands.push(Cmd::BindPipeline(pipeline.as_raw()));
        }

        fn push_constants(&mut self, _: vk::PipelineLayout, constants: &MeshPushConstants) {
            self.commands.push(Cmd::Push(constants.render_matrix));
        }

        fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) {
            self.commands.push(Cmd::BindVertexBuffer(buffer.as_raw()));
        }

        fn draw(&mut self, vertex_count: u32, instance_count: u32, _: u32, _: u32) {
            self.commands.push(Cmd::Draw(vertex_count, instance_count));
        }

        fn end_render_pass(&mut self) {
            self.commands.push(Cmd::EndPass);
        }
    }

    fn mesh(raw: u64, vertex_count: u32) -> MeshBinding {
        MeshBinding {
            vertex_buffer: vk::Buffer::from_raw(raw),
            vertex_count,
        }
    }

    fn material(raw: u64) -> MaterialBinding {
        MaterialBinding {
            pipeline: vk::Pipeline::from_raw(raw),
            layout: vk::PipelineLayout::from_raw(raw),
        }
    }

    fn target() -> PassTarget {
        PassTarget {
            render_pass: vk::RenderPass::from_raw(1),
            framebuffer: vk::Framebuffer::from_raw(2),
            extent: vk::Extent2D {
                width: 1200,
                height: 600,
            },
        }
    }

    #[test]
    fn test_shared_material_and_mesh_bind_once() {
        let objects: Vec<_> = (0..10)
            .map(|i| {
                RenderObject::new(
                    mesh(5, 3),
                    material(9),
                    Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
                )
            })
            .collect();

        let mut recorder = MockRecorder::default();
        let draws = record_scene_pass(&mut recorder, target(), Mat4::IDENTITY, &objects);

        assert_eq!(draws, 10);
        assert_eq!(recorder.pipeline_binds(), 1);
        assert_eq!(recorder.vertex_binds(), 1);
        assert_eq!(recorder.draws(), 10);
    }

    #[test]
    fn test_distinct_materials_bind_each() {
        let objects: Vec<_> = (0..4)
            .map(|i| RenderObject::new(mesh(5, 3), material(100 + i), Mat4::IDENTITY))
            .collect();

        let mut recorder = MockRecorder::default();
        record_scene_pass(&mut recorder, target(), Mat4::IDENTITY, &objects);

        assert_eq!(recorder.pipeline_binds(), 4);
        assert_eq!(recorder.vertex_binds(), 1);
    }

    #[test]
    fn test_alternating_meshes_rebind() {
        let objects = [
            RenderObject::new(mesh(1, 3), material(9), Mat4::IDENTITY),
            RenderObject::new(mesh(2, 6), material(9), Mat4::IDENTITY),
            RenderObject::new(mesh(1, 3), material(9), Mat4::IDENTITY),
        ];

        let mut recorder = MockRecorder::default();
        record_scene_pass(&mut recorder, target(), Mat4::IDENTITY, &objects);

        assert_eq!(recorder.vertex_binds(), 3);
        assert_eq!(recorder.pipeline_binds(), 1);
    }

    #[test]
    fn test_empty_scene_only_clears() {
        let mut recorder = MockRecorder::default();
        let draws = record_scene_pass(&mut recorder, target(), Mat4::IDENTITY, &[]);

        assert_eq!(draws, 0);
        assert_eq!(
            recorder.commands,
            vec![Cmd::BeginPass, Cmd::Viewport, Cmd::EndPass]
        );
    }

    #[test]
    fn test_command_order_per_object() {
        let objects = [RenderObject::new(mesh(7, 36), material(3), Mat4::IDENTITY)];

        let mut recorder = MockRecorder::default();
        record_scene_pass(&mut recorder, target(), Mat4::IDENTITY, &objects);

        assert_eq!(
            recorder.commands,
            vec![
                Cmd::BeginPass,
                Cmd::Viewport,
                Cmd::BindPipeline(3),
                Cmd::Push(Mat4::IDENTITY),
                Cmd::BindVertexBuffer(7),
                Cmd::Draw(36, 1),
                Cmd::EndPass,
            ]
        );
    }

    #[test]
    fn test_push_constant_is_view_projection_times_model() {
        let view_projection = Mat4::from_scale(Vec3::splat(2.0));
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let objects = [RenderObject::new(mesh(1, 3), material(1), model)];

        let mut recorder = MockRecorder::default();
        draw_objects(&mut recorder, view_projection, &objects);

        assert!(recorder.commands.contains(&Cmd::Push(view_projection * model)));
    }
}
