//! Command pool and command buffer management.
//!
//! - [`CommandPool`] owns a VkCommandPool bound to one queue family
//! - [`CommandBuffer`] records one frame's commands: render pass bracket,
//!   pipeline binds, dynamic viewport/scissor, push constants, vertex
//!   buffer binds and draws
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use manaburn_rhi::command::{CommandBuffer, CommandPool};
//! use manaburn_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>) -> Result<(), manaburn_rhi::RhiError> {
//! let queue_family = device.queue_families().graphics_family.unwrap_or(0);
//! let pool = CommandPool::new(device.clone(), queue_family)?;
//! let cmd = CommandBuffer::new(device.clone(), &pool)?;
//!
//! cmd.begin()?;
//! // ... record rendering commands ...
//! cmd.end()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Clear color for the swapchain attachment (opaque black).
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Clear depth for the depth attachment (far plane).
pub const CLEAR_DEPTH: f32 = 1.0;

/// Vulkan command pool wrapper.
///
/// Each frame slot owns one pool so that slots never contend for the same
/// pool. Pools are created with `RESET_COMMAND_BUFFER` so the frame's buffer
/// can be reset individually.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a new command pool for the specified queue family.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `queue_family_index` - The queue family for command buffer submission
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        // SAFETY: The device is live and create_info is valid.
        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        debug!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates a primary command buffer from this pool.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_command_buffer(&self) -> RhiResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        // SAFETY: The pool is live and owned by this device.
        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        buffers
            .into_iter()
            .next()
            .ok_or_else(|| RhiError::InvalidHandle("no command buffer allocated".to_string()))
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        // SAFETY: Buffers allocated from this pool are no longer pending; the
        // owner waits for device idle first.
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        debug!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Vulkan command buffer wrapper.
///
/// Commands are recorded between [`begin`](Self::begin) and [`end`](Self::end).
///
/// # Note
///
/// The wrapper does NOT own the VkCommandBuffer handle; it is freed with the
/// owning [`CommandPool`].
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Allocates a new command buffer from the given pool.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn new(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let buffer = pool.allocate_command_buffer()?;
        Ok(Self { device, buffer })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Resets the buffer and opens it for one-time-submit recording.
    ///
    /// The caller must have waited on the fence guarding the buffer's previous
    /// submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset or begin fails, which indicates the
    /// buffer is still pending or already recording.
    pub fn begin(&self) -> RhiResult<()> {
        self.reset()?;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        // SAFETY: The buffer was just reset and is in the initial state.
        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    /// Ends recording. After this call the buffer is ready for submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the recording was malformed.
    pub fn end(&self) -> RhiResult<()> {
        // SAFETY: The buffer is in the recording state.
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        Ok(())
    }

    /// Resets the command buffer to its initial state.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> RhiResult<()> {
        // SAFETY: The pool was created with RESET_COMMAND_BUFFER and the
        // buffer is not pending.
        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())?;
        }

        Ok(())
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins a render pass against `framebuffer`, clearing color to
    /// [`CLEAR_COLOR`] and depth to [`CLEAR_DEPTH`].
    ///
    /// # Arguments
    ///
    /// * `render_pass` - Render pass the framebuffer was built for
    /// * `framebuffer` - Framebuffer of the acquired swapchain image
    /// * `extent` - Render area (full surface extent)
    pub fn begin_render_pass(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
    ) {
        let clear_values = clear_values();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(full_scissor(extent))
            .clear_values(&clear_values);

        // SAFETY: The buffer is recording and the handles are live.
        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    pub fn end_render_pass(&self) {
        // SAFETY: A render pass was begun on this buffer.
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // Pipeline Binding
    // =========================================================================

    /// Binds a graphics pipeline.
    pub fn bind_pipeline(&self, pipeline: vk::Pipeline) {
        // SAFETY: The buffer is recording and the pipeline is live.
        unsafe {
            self.device.handle().cmd_bind_pipeline(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Binds one vertex buffer at binding 0, offset 0.
    pub fn bind_vertex_buffer(&self, buffer: vk::Buffer) {
        // SAFETY: The buffer is recording and the vertex buffer is live.
        unsafe {
            self.device
                .handle()
                .cmd_bind_vertex_buffers(self.buffer, 0, &[buffer], &[0]);
        }
    }

    // =========================================================================
    // Dynamic State
    // =========================================================================

    /// Sets the dynamic viewport (depth range 0..1) and scissor to cover
    /// the whole extent.
    pub fn set_viewport_scissor(&self, extent: vk::Extent2D) {
        // SAFETY: The bound pipeline declares viewport and scissor as dynamic.
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, &[full_viewport(extent)]);
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, &[full_scissor(extent)]);
        }
    }

    // =========================================================================
    // Push Constants
    // =========================================================================

    /// Uploads `data` to the vertex-stage push constant range at offset 0.
    ///
    /// # Type Parameters
    ///
    /// * `T` - A plain-old-data block matching the layout's range
    pub fn push_constants<T: bytemuck::Pod>(&self, layout: vk::PipelineLayout, data: &T) {
        // SAFETY: The layout declares a vertex-stage range covering size_of::<T>().
        unsafe {
            self.device.handle().cmd_push_constants(
                self.buffer,
                layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::bytes_of(data),
            );
        }
    }

    // =========================================================================
    // Drawing Commands
    // =========================================================================

    /// Issues a non-indexed draw command.
    ///
    /// # Arguments
    ///
    /// * `vertex_count` - Number of vertices to draw
    /// * `instance_count` - Number of instances to draw
    /// * `first_vertex` - Offset to the first vertex
    /// * `first_instance` - Offset to the first instance
    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        // SAFETY: A pipeline and vertex buffer are bound inside a render pass.
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }
}

/// Clear values in attachment order: color, then depth.
pub fn clear_values() -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: CLEAR_COLOR,
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: CLEAR_DEPTH,
                stencil: 0,
            },
        },
    ]
}

/// Viewport covering the full extent with depth range [0, 1].
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor covering the full extent.
pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

// SAFETY: The wrappers only hold handles and an Arc<Device>; external
// synchronization (one slot per frame) guards recording.
unsafe impl Send for CommandBuffer {}
unsafe impl Send for CommandPool {}
