//! Swapchain and the render targets that depend on it.
//!
//! Everything here is sized or formatted after the swapchain, so it is built
//! and destroyed as one unit. A rebuild is always a full teardown followed by
//! a fresh build; nothing is patched in place.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use manaburn_rhi::device::Device;
use manaburn_rhi::framebuffer::Framebuffer;
use manaburn_rhi::image::DepthImage;
use manaburn_rhi::instance::Instance;
use manaburn_rhi::render_pass::RenderPass;
use manaburn_rhi::swapchain::Swapchain;
use manaburn_rhi::{RhiError, RhiResult};

/// Attachment list for each framebuffer: the image's color view followed by
/// the shared depth view.
pub fn framebuffer_attachments(
    color_views: &[vk::ImageView],
    depth_view: vk::ImageView,
) -> Vec<[vk::ImageView; 2]> {
    color_views.iter().map(|&view| [view, depth_view]).collect()
}

/// Swapchain, depth image, render pass and per-image framebuffers.
///
/// Fields drop in declaration order, which is the required teardown order:
/// framebuffers, depth image, render pass, then the swapchain with its views.
pub struct SwapchainTargets {
    framebuffers: Vec<Framebuffer>,
    // Only referenced through the framebuffers' attachments
    _depth_image: DepthImage,
    render_pass: RenderPass,
    swapchain: Swapchain,
}

impl SwapchainTargets {
    fn create(
        instance: &Instance,
        device: &Arc<Device>,
        surface: vk::SurfaceKHR,
        window_extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let swapchain = Swapchain::new(instance, device.clone(), surface, window_extent)?;
        let extent = swapchain.extent();

        let depth_image = DepthImage::new(device.clone(), extent)?;
        let render_pass = RenderPass::new(device.clone(), swapchain.format(), depth_image.format())?;

        let framebuffers = framebuffer_attachments(swapchain.image_views(), depth_image.view())
            .iter()
            .map(|attachments| {
                Framebuffer::new(device.clone(), render_pass.handle(), attachments, extent)
            })
            .collect::<RhiResult<Vec<_>>>()?;

        debug!("Created {} framebuffers", framebuffers.len());

        Ok(Self {
            framebuffers,
            _depth_image: depth_image,
            render_pass,
            swapchain,
        })
    }

    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    #[inline]
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.swapchain.format()
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Framebuffer of swapchain image `image_index`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::InvalidHandle`] if the index is out of range.
    pub fn framebuffer(&self, image_index: u32) -> RhiResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| {
                RhiError::InvalidHandle(format!(
                    "no framebuffer for swapchain image {}",
                    image_index
                ))
            })
    }
}

/// Owns the current [`SwapchainTargets`] and rebuilds them on demand.
pub struct SwapchainManager {
    device: Arc<Device>,
    surface: vk::SurfaceKHR,
    targets: Option<SwapchainTargets>,
    rebuild_count: u32,
}

impl SwapchainManager {
    /// Builds the swapchain and its targets for `window_extent`.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the swapchain, depth image, render pass or
    /// framebuffers cannot be created.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        window_extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let targets = SwapchainTargets::create(instance, &device, surface, window_extent)?;

        info!(
            "Swapchain targets ready: {}x{}, {} images",
            targets.extent().width,
            targets.extent().height,
            targets.image_count()
        );

        Ok(Self {
            device,
            surface,
            targets: Some(targets),
            rebuild_count: 0,
        })
    }

    /// Current targets.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SwapchainError`] if a previous rebuild failed
    /// after teardown.
    pub fn targets(&self) -> RhiResult<&SwapchainTargets> {
        self.targets
            .as_ref()
            .ok_or_else(|| RhiError::SwapchainError("swapchain is not built".to_string()))
    }

    /// Number of completed rebuilds since creation.
    #[inline]
    pub fn rebuild_count(&self) -> u32 {
        self.rebuild_count
    }

    /// Waits for the device to go idle, destroys every target, and builds
    /// new ones for `window_extent`.
    ///
    /// The surface is queried first. If it currently has no area the old
    /// targets are kept and `Ok(false)` is returned; the caller retries later.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface query, the idle wait or any creation
    /// step fails. A failure after teardown leaves the manager without
    /// targets.
    pub fn rebuild(&mut self, instance: &Instance, window_extent: vk::Extent2D) -> RhiResult<bool> {
        let plan = Swapchain::plan_for(instance, &self.device, self.surface, window_extent)?;
        if !plan.is_drawable() {
            debug!(
                "Deferring swapchain rebuild: surface extent is {}x{}",
                plan.extent.width, plan.extent.height
            );
            return Ok(false);
        }

        self.device.wait_idle()?;

        // Drops framebuffers, depth image, render pass, then swapchain
        self.targets = None;

        let targets = SwapchainTargets::create(instance, &self.device, self.surface, window_extent)?;
        self.rebuild_count += 1;

        info!(
            "Swapchain rebuilt ({}): {}x{}, {} images",
            self.rebuild_count,
            targets.extent().width,
            targets.extent().height,
            targets.image_count()
        );

        self.targets = Some(targets);
        Ok(true)
    }
}
