//! Main renderer orchestration.
//!
//! [`Renderer`] owns every GPU object of the engine and runs one
//! [`FrameSynchronizer`] cycle per [`Renderer::draw`] call.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use glam::Mat4;
use tracing::{debug, error, info, warn};

use manaburn_core::{EngineConfig, Extent};
use manaburn_platform::{Surface, Window};
use manaburn_resources::{MeshData, ResourceError, load_obj, triangle_mesh};
use manaburn_rhi::RhiResult;
use manaburn_rhi::device::{Device, GraphicsSubmit, SemaphoreStage};
use manaburn_rhi::instance::Instance;
use manaburn_rhi::physical_device::select_physical_device;
use manaburn_rhi::swapchain::{AcquireOutcome, PresentOutcome};
use manaburn_scene::Camera;

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::draw::{PassTarget, record_scene_pass};
use crate::error::RendererResult;
use crate::frame::{FramePool, release_slot};
use crate::material::Material;
use crate::mesh::GpuMesh;
use crate::render_object::RenderObject;
use crate::swapchain_manager::{SwapchainManager, SwapchainTargets};
use crate::synchronizer::{FrameBackend, FrameOutcome, FrameSynchronizer};

fn to_vk_extent(extent: Extent) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

/// One frame's view of the renderer, driven by the synchronizer.
struct GpuFrame<'a> {
    instance: &'a Instance,
    device: &'a Arc<Device>,
    swapchain: &'a mut SwapchainManager,
    frames: &'a mut FramePool,
    material: &'a mut Material,
    material_format: &'a mut vk::Format,
    meshes: &'a [GpuMesh],
    scene: &'a mut Vec<RenderObject>,
    config: &'a EngineConfig,
    window_extent: Extent,
    view_projection: Mat4,
}

impl GpuFrame<'_> {
    fn targets(&self) -> RhiResult<&SwapchainTargets> {
        self.swapchain.targets()
    }
}

impl FrameBackend for GpuFrame<'_> {
    fn wait_fence(&mut self, slot: usize) -> RhiResult<()> {
        self.frames
            .slot_at(slot)
            .render_fence()
            .wait(self.config.frame_timeout_ns())
    }

    fn reset_fence(&mut self, slot: usize) -> RhiResult<()> {
        self.frames.slot_at(slot).render_fence().reset()
    }

    fn flush_deletions(&mut self, slot: usize) {
        let released = self.frames.slot_at_mut(slot).deletion_queue_mut().flush();
        if released > 0 {
            debug!("Released {} deferred resource(s) on slot {}", released, slot);
        }
    }

    fn acquire_image(&mut self, slot: usize) -> RhiResult<AcquireOutcome> {
        let semaphore = self.frames.slot_at(slot).image_available().handle();
        self.targets()?
            .swapchain()
            .acquire_next_image(semaphore, self.config.acquire_timeout_ns())
    }

    fn record(&mut self, slot: usize, image_index: u32) -> RhiResult<()> {
        let targets = self.swapchain.targets()?;
        let target = PassTarget {
            render_pass: targets.render_pass(),
            framebuffer: targets.framebuffer(image_index)?,
            extent: targets.extent(),
        };

        let cmd = self.frames.slot_at_mut(slot).command_buffer_mut();
        cmd.begin()?;
        record_scene_pass(cmd, target, self.view_projection, self.scene.as_slice());
        cmd.end()
    }

    fn submit(&mut self, slot: usize) -> RhiResult<()> {
        let slot = self.frames.slot_at(slot);
        let submit = GraphicsSubmit {
            command_buffer: slot.command_buffer().handle(),
            wait: SemaphoreStage {
                semaphore: slot.image_available().handle(),
                stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            },
            signal: SemaphoreStage {
                semaphore: slot.render_complete().handle(),
                stage: vk::PipelineStageFlags2::ALL_GRAPHICS,
            },
        };

        // SAFETY: The buffer was just recorded and the fence was reset after
        // its previous submission completed.
        unsafe {
            self.device
                .submit_graphics(&submit, slot.render_fence().handle())
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> RhiResult<PresentOutcome> {
        let wait = self.frames.slot_at(slot).render_complete().handle();
        self.targets()?
            .swapchain()
            .present(self.device.present_queue(), image_index, wait)
    }

    /// Full teardown and rebuild of the swapchain targets, followed by fresh
    /// frame slots so no fence refers to work on the old targets.
    fn rebuild(&mut self) -> RhiResult<bool> {
        if self.window_extent.is_empty() {
            debug!("Deferring swapchain rebuild: window has zero extent");
            return Ok(false);
        }

        if !self
            .swapchain
            .rebuild(self.instance, to_vk_extent(self.window_extent))?
        {
            return Ok(false);
        }

        // Device is idle after the rebuild
        let released = self.frames.flush_all();
        if released > 0 {
            debug!("Released {} deferred resource(s) during rebuild", released);
        }
        *self.frames = FramePool::new(Arc::clone(self.device))?;

        let format = self.swapchain.targets()?.format();
        if format != *self.material_format {
            warn!(
                "Swapchain format changed ({:?} -> {:?}), rebuilding materials",
                *self.material_format, format
            );
            *self.material = Material::mesh_material(
                Arc::clone(self.device),
                self.swapchain.targets()?.render_pass(),
                self.config,
            )?;
            *self.material_format = format;
            *self.scene = build_scene(self.meshes, self.material);
        }

        Ok(true)
    }
}

/// Main renderer that owns all Vulkan resources.
///
/// # Resource Destruction Order
///
/// 1. Wait for the device to go idle
/// 2. Flush every deferred release
/// 3. Frame slots (command buffers, pools, semaphores, fences)
/// 4. Meshes, then materials
/// 5. Swapchain targets (framebuffers, depth image, render pass, swapchain)
/// 6. Device
/// 7. Surface
/// 8. Instance
///
/// ManuallyDrop is used to enforce this order.
pub struct Renderer {
    instance: ManuallyDrop<Instance>,
    surface: ManuallyDrop<Surface>,
    device: ManuallyDrop<Arc<Device>>,
    swapchain: ManuallyDrop<SwapchainManager>,
    frames: ManuallyDrop<FramePool>,
    synchronizer: FrameSynchronizer,

    material: ManuallyDrop<Material>,
    /// Color format the material's pipeline was built against.
    material_format: vk::Format,
    meshes: ManuallyDrop<Vec<GpuMesh>>,
    scene: Vec<RenderObject>,

    config: EngineConfig,
    window_extent: Extent,
}

impl Renderer {
    /// Initializes every GPU object and the default scene.
    ///
    /// `config` is expected to have passed [`EngineConfig::validate`].
    ///
    /// # Errors
    ///
    /// Any failure is fatal: no GPU offers the required extensions, a
    /// shader file is missing, or a Vulkan object cannot be created.
    pub fn new(window: &Window, config: &EngineConfig) -> RendererResult<Self> {
        let window_extent = window.inner_size();

        info!(
            "Initializing Vulkan renderer ({}x{})",
            window_extent.width, window_extent.height
        );

        let instance = Instance::new(config, &window.required_extensions()?)?;
        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let physical_device_info = select_physical_device(
            instance.handle(),
            surface.handle(),
            surface.loader(),
            config.device_extensions(),
        )?;
        let device = Device::new(&instance, &physical_device_info)?;

        let swapchain = SwapchainManager::new(
            &instance,
            device.clone(),
            surface.handle(),
            to_vk_extent(window_extent),
        )?;
        let frames = FramePool::new(device.clone())?;

        let targets = swapchain.targets()?;
        let material_format = targets.format();
        let material = Material::mesh_material(device.clone(), targets.render_pass(), config)?;

        let mesh_data = load_scene_mesh(config)?;
        let meshes = vec![GpuMesh::upload(
            device.clone(),
            &mesh_data.name,
            &mesh_data.vertices,
        )?];

        let scene = build_scene(&meshes, &material);

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight, {} render objects",
            targets.image_count(),
            MAX_FRAMES_IN_FLIGHT,
            scene.len()
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
            swapchain: ManuallyDrop::new(swapchain),
            frames: ManuallyDrop::new(frames),
            synchronizer: FrameSynchronizer::new(),
            material: ManuallyDrop::new(material),
            material_format,
            meshes: ManuallyDrop::new(meshes),
            scene,
            config: config.clone(),
            window_extent,
        })
    }

    /// Renders one frame from `camera`.
    ///
    /// A pending resize is applied first. If the surface turns out stale,
    /// the swapchain is rebuilt before returning. While the surface has no
    /// area the frame is skipped with [`FrameOutcome::ResizeRequired`].
    ///
    /// # Errors
    ///
    /// Any GPU error, including a fence timeout, is fatal.
    pub fn draw(&mut self, camera: &Camera) -> RendererResult<FrameOutcome> {
        let mut frame = GpuFrame {
            instance: &self.instance,
            device: &self.device,
            swapchain: &mut self.swapchain,
            frames: &mut self.frames,
            material: &mut self.material,
            material_format: &mut self.material_format,
            meshes: &self.meshes,
            scene: &mut self.scene,
            config: &self.config,
            window_extent: self.window_extent,
            view_projection: camera.view_projection_matrix(),
        };

        Ok(self.synchronizer.draw_frame(&mut frame)?)
    }

    /// Flags the swapchain for a rebuild at `extent` before the next frame.
    pub fn request_resize(&mut self, extent: Extent) {
        if extent.width != self.window_extent.width || extent.height != self.window_extent.height {
            debug!(
                "Resize requested: {}x{} -> {}x{}",
                self.window_extent.width, self.window_extent.height, extent.width, extent.height
            );
        }
        self.window_extent = extent;
        self.synchronizer.request_rebuild();
    }

    /// Keeps `resource` alive until the GPU has finished every frame
    /// submitted so far.
    ///
    /// The release is queued on the slot of the last submitted frame and
    /// runs after that slot's fence is next waited on.
    pub fn defer_release<T: Send + 'static>(&mut self, resource: T) {
        let slot = release_slot(self.synchronizer.frame_number());
        self.frames.slot_at_mut(slot).deletion_queue_mut().defer(resource);
    }

    /// Number of frames submitted so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.synchronizer.frame_number()
    }

    /// Number of swapchain rebuilds since startup.
    #[inline]
    pub fn rebuild_count(&self) -> u32 {
        self.swapchain.rebuild_count()
    }

    /// Current swapchain extent.
    ///
    /// # Errors
    ///
    /// Returns an error if the swapchain is not built.
    pub fn extent(&self) -> RendererResult<vk::Extent2D> {
        Ok(self.swapchain.targets()?.extent())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        let released = self.frames.flush_all();
        if released > 0 {
            debug!("Released {} deferred resource(s) at shutdown", released);
        }

        self.scene.clear();

        // SAFETY: Each field is dropped exactly once and never used again;
        // the device is idle.
        unsafe {
            ManuallyDrop::drop(&mut self.frames);
            ManuallyDrop::drop(&mut self.meshes);
            ManuallyDrop::drop(&mut self.material);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}

/// Loads the configured OBJ mesh, falling back to the built-in triangle when
/// the file does not exist.
fn load_scene_mesh(config: &EngineConfig) -> RendererResult<MeshData> {
    let path = config.mesh_path();
    match load_obj(&path) {
        Ok(mesh) => Ok(mesh),
        Err(ResourceError::FileNotFound(_)) => {
            warn!(
                "Mesh {} not found, using built-in triangle",
                path.display()
            );
            Ok(triangle_mesh())
        }
        Err(e) => Err(e.into()),
    }
}

/// Default scene: every mesh drawn with the mesh material at the origin.
fn build_scene(meshes: &[GpuMesh], material: &Material) -> Vec<RenderObject> {
    meshes
        .iter()
        .map(|mesh| RenderObject::new(mesh.binding(), material.binding(), Mat4::IDENTITY))
        .collect()
}
