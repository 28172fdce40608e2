//! Swapchain management.
//!
//! This module handles VkSwapchainKHR creation, image acquisition, and
//! presentation. All selection decisions (format, present mode, extent,
//! image count, sharing mode) are made by [`SwapchainPlan`], a pure function
//! of the surface support and the window size, so a rebuild against
//! unchanged capabilities reproduces the same chain.
//!
//! There is no in-place recreation: on resize the owner drops the
//! [`Swapchain`] and builds a new one.
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ash::vk;
//! # use manaburn_rhi::{device::Device, instance::Instance, swapchain::{AcquireOutcome, Swapchain}};
//! # fn example(instance: &Instance, device: Arc<Device>, surface: vk::SurfaceKHR, semaphore: vk::Semaphore)
//! # -> Result<(), manaburn_rhi::RhiError> {
//! let swapchain = Swapchain::new(instance, device, surface, vk::Extent2D { width: 1200, height: 600 })?;
//!
//! match swapchain.acquire_next_image(semaphore, 1_000_000_000)? {
//!     AcquireOutcome::Ready(image_index) => { /* record and present */ }
//!     AcquireOutcome::Stale => { /* rebuild the swapchain */ }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::RhiError;
use crate::instance::Instance;
use crate::physical_device::QueueFamilyIndices;

/// Preferred swapchain format: 8-bit BGRA in the sRGB nonlinear color space.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Result of asking the swapchain for the next image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image index ready once the passed semaphore signals.
    Ready(u32),
    /// The surface no longer matches the swapchain; rebuild before drawing.
    Stale,
}

/// Result of presenting an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// The surface no longer matches the swapchain; rebuild before drawing.
    Stale,
}

/// Swapchain surface support details.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (min/max image count, extents, transforms, etc.)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations)
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Self, RhiError> {
        // SAFETY: The physical device and surface come from the same instance.
        let (capabilities, formats, present_modes) = unsafe {
            (
                surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?,
                surface_loader.get_physical_device_surface_formats(physical_device, surface)?,
                surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)?,
            )
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// True if at least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// How swapchain images are shared between queue families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSharing {
    Exclusive,
    /// Graphics and present families differ.
    Concurrent { graphics: u32, present: u32 },
}

/// Every decision needed to create a swapchain.
#[derive(Clone, Copy, Debug)]
pub struct SwapchainPlan {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing: ImageSharing,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainPlan {
    /// Derive the swapchain configuration from surface support.
    ///
    /// # Arguments
    ///
    /// * `support` - Queried surface support
    /// * `window_extent` - Current drawable size of the window in pixels
    /// * `queue_families` - Graphics and present families of the device
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SwapchainError`] when the surface offers no format
    /// or present mode, or the queue families are incomplete.
    pub fn new(
        support: &SwapchainSupportDetails,
        window_extent: vk::Extent2D,
        queue_families: &QueueFamilyIndices,
    ) -> Result<Self, RhiError> {
        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let (graphics, present) = match (
            queue_families.graphics_family,
            queue_families.present_family,
        ) {
            (Some(graphics), Some(present)) => (graphics, present),
            _ => {
                return Err(RhiError::SwapchainError(
                    "Queue families incomplete".to_string(),
                ));
            }
        };

        let sharing = if graphics != present {
            ImageSharing::Concurrent { graphics, present }
        } else {
            ImageSharing::Exclusive
        };

        let surface_format = choose_surface_format(&support.formats);

        Ok(Self {
            format: surface_format.format,
            color_space: surface_format.color_space,
            present_mode: choose_present_mode(&support.present_modes),
            extent: choose_extent(&support.capabilities, window_extent),
            image_count: determine_image_count(&support.capabilities),
            sharing,
            pre_transform: support.capabilities.current_transform,
        })
    }
}

impl SwapchainPlan {
    /// False when the surface currently has no area, as reported by some
    /// platforms while the window is minimized. No swapchain can be created
    /// for such a plan.
    #[inline]
    pub fn is_drawable(&self) -> bool {
        self.extent.width > 0 && self.extent.height > 0
    }
}

impl PartialEq for SwapchainPlan {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.color_space == other.color_space
            && self.present_mode == other.present_mode
            && self.extent.width == other.extent.width
            && self.extent.height == other.extent.height
            && self.image_count == other.image_count
            && self.sharing == other.sharing
            && self.pre_transform == other.pre_transform
    }
}

/// Vulkan swapchain wrapper.
///
/// Owns the swapchain and one image view per swapchain image. Images are
/// owned by the swapchain itself.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    plan: SwapchainPlan,
}

impl Swapchain {
    /// Creates a new swapchain sized to the window's drawable extent.
    ///
    /// # Arguments
    ///
    /// * `instance` - The Vulkan instance
    /// * `device` - The logical device
    /// * `surface` - The window surface
    /// * `window_extent` - Drawable window size, used when the surface leaves
    ///   the extent to the application
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Surface queries fail
    /// - No suitable format or present mode is available
    /// - Swapchain creation fails
    /// - Image view creation fails
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        window_extent: vk::Extent2D,
    ) -> Result<Self, RhiError> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());

        let plan = Self::plan_for(instance, &device, surface, window_extent)?;
        if !plan.is_drawable() {
            return Err(RhiError::SwapchainError(format!(
                "surface extent is {}x{}",
                plan.extent.width, plan.extent.height
            )));
        }

        info!(
            "Creating swapchain: {}x{}, format {:?}, color space {:?}, present mode {:?}, {} images",
            plan.extent.width,
            plan.extent.height,
            plan.format,
            plan.color_space,
            plan.present_mode,
            plan.image_count
        );

        let concurrent_families;
        let (sharing_mode, queue_family_indices) = match plan.sharing {
            ImageSharing::Concurrent { graphics, present } => {
                debug!(
                    "Using CONCURRENT sharing mode between graphics ({}) and present ({}) queues",
                    graphics, present
                );
                concurrent_families = [graphics, present];
                (vk::SharingMode::CONCURRENT, &concurrent_families[..])
            }
            ImageSharing::Exclusive => (vk::SharingMode::EXCLUSIVE, &[][..]),
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(plan.image_count)
            .image_format(plan.format)
            .image_color_space(plan.color_space)
            .image_extent(plan.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices)
            .pre_transform(plan.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(plan.present_mode)
            .clipped(true);

        // SAFETY: The surface is live and create_info references locals only.
        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        // SAFETY: The swapchain was just created.
        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                // SAFETY: Nothing references the fresh swapchain yet.
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e.into());
            }
        };
        info!("Swapchain created with {} images", images.len());

        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views: Vec::new(),
            plan,
        };
        this.image_views = create_image_views(&this.device, &this.images, plan.format)?;

        Ok(this)
    }

    /// Queries the surface and derives the plan a swapchain built now would
    /// use, without creating anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface queries fail or the support is
    /// inadequate.
    pub fn plan_for(
        instance: &Instance,
        device: &Device,
        surface: vk::SurfaceKHR,
        window_extent: vk::Extent2D,
    ) -> Result<SwapchainPlan, RhiError> {
        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
        let support =
            SwapchainSupportDetails::query(device.physical_device(), surface, &surface_loader)?;
        SwapchainPlan::new(&support, window_extent, device.queue_families())
    }

    /// Requests the next presentable image.
    ///
    /// `semaphore` is signaled when the image is actually ready.
    ///
    /// # Errors
    ///
    /// Out-of-date and suboptimal surfaces are reported as
    /// [`AcquireOutcome::Stale`]; any other failure is an error.
    pub fn acquire_next_image(
        &self,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome, RhiError> {
        // SAFETY: The semaphore is unsignaled and not pending.
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                semaphore,
                vk::Fence::null(),
            )
        };
        classify_acquire(result)
    }

    /// Presents `image_index` on `queue` once `wait_semaphore` signals.
    ///
    /// # Errors
    ///
    /// Out-of-date and suboptimal surfaces are reported as
    /// [`PresentOutcome::Stale`]; any other failure is an error.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentOutcome, RhiError> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        // SAFETY: The image was acquired from this swapchain and rendering to
        // it was submitted with `wait_semaphore` as its signal.
        let result = unsafe { self.swapchain_loader.queue_present(queue, &present_info) };
        classify_present(result)
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// The decisions this swapchain was built from.
    #[inline]
    pub fn plan(&self) -> &SwapchainPlan {
        &self.plan
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.plan.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.plan.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.plan.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // SAFETY: The owner waited for device idle; views are destroyed
        // before the swapchain that owns their images.
        unsafe {
            for &image_view in &self.image_views {
                self.device.handle().destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.plan.extent.width,
            self.plan.extent.height,
            self.images.len()
        );
    }
}

fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> Result<AcquireOutcome, RhiError> {
    match result {
        Ok((image_index, false)) => Ok(AcquireOutcome::Ready(image_index)),
        Ok((_, true)) => {
            warn!("Swapchain suboptimal on acquire");
            Ok(AcquireOutcome::Stale)
        }
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
            warn!("Swapchain out of date on acquire");
            Ok(AcquireOutcome::Stale)
        }
        Err(e) => Err(RhiError::VulkanError(e)),
    }
}

fn classify_present(result: Result<bool, vk::Result>) -> Result<PresentOutcome, RhiError> {
    match result {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
            warn!("Swapchain stale on present");
            Ok(PresentOutcome::Stale)
        }
        Err(e) => Err(RhiError::VulkanError(e)),
    }
}

/// Prefers [`PREFERRED_SURFACE_FORMAT`], else the first advertised format.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = formats.iter().any(|f| {
        f.format == PREFERRED_SURFACE_FORMAT.format
            && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
    });
    if preferred {
        debug!("Selected preferred surface format: B8G8R8A8_SRGB with SRGB_NONLINEAR");
        return PREFERRED_SURFACE_FORMAT;
    }

    warn!(
        "Using first available surface format: {:?}",
        formats[0].format
    );
    formats[0]
}

/// Always FIFO: vsync-locked, tear free, and guaranteed to exist.
fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if !present_modes.contains(&vk::PresentModeKHR::FIFO) {
        warn!("Surface does not list FIFO, requesting it anyway");
    }
    vk::PresentModeKHR::FIFO
}

/// Uses the surface's fixed extent when it reports one, otherwise clamps the
/// window's drawable size to the surface limits.
fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        debug!(
            "Using current surface extent: {}x{}",
            capabilities.current_extent.width, capabilities.current_extent.height
        );
        return capabilities.current_extent;
    }

    let extent = vk::Extent2D {
        width: window_extent.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_extent.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    };

    debug!(
        "Calculated extent: {}x{} (window: {}x{})",
        extent.width, extent.height, window_extent.width, window_extent.height
    );

    extent
}

/// One more than the minimum, clamped to the maximum when one is set.
fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

/// Creates one 2D color view per swapchain image. Views created before a
/// failure are destroyed again.
fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>, RhiError> {
    let mut image_views = Vec::with_capacity(images.len());

    for (i, &image) in images.iter().enumerate() {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        // SAFETY: `image` belongs to a live swapchain on this device.
        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => image_views.push(view),
            Err(e) => {
                for view in image_views {
                    // SAFETY: The views were created above and never used.
                    unsafe { device.handle().destroy_image_view(view, None) };
                }
                return Err(RhiError::SwapchainError(format!(
                    "Failed to create image view {}: {:?}",
                    i, e
                )));
            }
        }
    }

    debug!("Created {} image views", image_views.len());
    Ok(image_views)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_capabilities(width: u32, height: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            current_extent: vk::Extent2D { width, height },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    fn support(capabilities: vk::SurfaceCapabilitiesKHR) -> SwapchainSupportDetails {
        SwapchainSupportDetails {
            capabilities,
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                PREFERRED_SURFACE_FORMAT,
            ],
            present_modes: vec![vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO],
        }
    }

    fn shared_families() -> QueueFamilyIndices {
        QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        }
    }

    #[test]
    fn test_choose_surface_format_prefers_bgra_srgb() {
        let formats = support(fixed_capabilities(1, 1)).formats;
        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_choose_surface_format_fallback_to_first() {
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            },
        ];
        assert_eq!(
            choose_surface_format(&formats).format,
            vk::Format::R8G8B8A8_UNORM
        );
    }

    #[test]
    fn test_choose_present_mode_is_fifo_even_with_mailbox() {
        let modes = vec![
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::FIFO,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_choose_extent_uses_current() {
        let extent = choose_extent(
            &fixed_capabilities(1920, 1080),
            vk::Extent2D {
                width: 800,
                height: 600,
            },
        );
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn test_choose_extent_clamps_to_limits() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            max_image_extent: vk::Extent2D {
                width: 2000,
                height: 2000,
            },
            ..Default::default()
        };

        let extent = choose_extent(
            &capabilities,
            vk::Extent2D {
                width: 3000,
                height: 50,
            },
        );
        assert_eq!(extent.width, 2000);
        assert_eq!(extent.height, 100);

        let extent = choose_extent(
            &capabilities,
            vk::Extent2D {
                width: 800,
                height: 600,
            },
        );
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn test_determine_image_count() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 2);

        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 3);

        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 4);
    }

    #[test]
    fn test_swapchain_support_details_is_adequate() {
        let mut details = support(fixed_capabilities(1, 1));
        assert!(details.is_adequate());

        details.present_modes.clear();
        assert!(!details.is_adequate());
    }

    #[test]
    fn test_plan_fixed_extent_matches_window() {
        let plan = SwapchainPlan::new(
            &support(fixed_capabilities(1200, 600)),
            vk::Extent2D {
                width: 1200,
                height: 600,
            },
            &shared_families(),
        )
        .unwrap();

        assert_eq!(plan.extent.width, 1200);
        assert_eq!(plan.extent.height, 600);
        assert_eq!(plan.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(plan.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        assert_eq!(plan.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(plan.image_count, 3);
        assert_eq!(plan.sharing, ImageSharing::Exclusive);
    }

    #[test]
    fn test_plan_concurrent_when_families_differ() {
        let families = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(1),
        };
        let plan = SwapchainPlan::new(
            &support(fixed_capabilities(640, 480)),
            vk::Extent2D {
                width: 640,
                height: 480,
            },
            &families,
        )
        .unwrap();

        assert_eq!(
            plan.sharing,
            ImageSharing::Concurrent {
                graphics: 0,
                present: 1
            }
        );
    }

    #[test]
    fn test_plan_rebuild_is_reproducible() {
        let details = support(fixed_capabilities(1200, 600));
        let window = vk::Extent2D {
            width: 1200,
            height: 600,
        };
        let first = SwapchainPlan::new(&details, window, &shared_families()).unwrap();
        let second = SwapchainPlan::new(&details, window, &shared_families()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_plan_minimized_surface_is_not_drawable() {
        // Surface reports 0x0 while the cached window size is still 1200x600
        let plan = SwapchainPlan::new(
            &support(fixed_capabilities(0, 0)),
            vk::Extent2D {
                width: 1200,
                height: 600,
            },
            &shared_families(),
        )
        .unwrap();

        assert_eq!(plan.extent.width, 0);
        assert!(!plan.is_drawable());

        let plan = SwapchainPlan::new(
            &support(fixed_capabilities(800, 0)),
            vk::Extent2D {
                width: 800,
                height: 600,
            },
            &shared_families(),
        )
        .unwrap();
        assert!(!plan.is_drawable());
    }

    #[test]
    fn test_plan_with_area_is_drawable() {
        let plan = SwapchainPlan::new(
            &support(fixed_capabilities(1, 1)),
            vk::Extent2D {
                width: 1,
                height: 1,
            },
            &shared_families(),
        )
        .unwrap();
        assert!(plan.is_drawable());
    }

    #[test]
    fn test_plan_rejects_inadequate_support() {
        let mut details = support(fixed_capabilities(1, 1));
        details.formats.clear();
        let result = SwapchainPlan::new(
            &details,
            vk::Extent2D {
                width: 1,
                height: 1,
            },
            &shared_families(),
        );
        assert!(matches!(result, Err(RhiError::SwapchainError(_))));
    }

    #[test]
    fn test_classify_acquire() {
        assert_eq!(classify_acquire(Ok((2, false))).unwrap(), AcquireOutcome::Ready(2));
        assert_eq!(classify_acquire(Ok((0, true))).unwrap(), AcquireOutcome::Stale);
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            AcquireOutcome::Stale
        );
        assert!(classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)).is_err());
    }

    #[test]
    fn test_classify_present() {
        assert_eq!(classify_present(Ok(false)).unwrap(), PresentOutcome::Presented);
        assert_eq!(classify_present(Ok(true)).unwrap(), PresentOutcome::Stale);
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            PresentOutcome::Stale
        );
        assert!(classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).is_err());
    }
}
