//! Device-local images.
//!
//! Only the depth attachment is needed: a single-sample, single-mip 2D image
//! in `D32_SFLOAT`, sized to the swapchain and rebuilt with it.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Depth attachment format (32-bit float depth, no stencil).
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Depth image, its GPU-only allocation, and a depth-aspect view.
///
/// Dropped in reverse creation order: view, image, allocation.
pub struct DepthImage {
    device: Arc<Device>,
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
    extent: vk::Extent2D,
}

impl DepthImage {
    /// Creates a depth image matching `extent`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::InvalidHandle`] for a zero-sized extent, or an
    /// error if image creation, allocation or view creation fails.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidHandle(format!(
                "Depth image extent must be non-zero, got {}x{}",
                extent.width, extent.height
            )));
        }

        let image_info = depth_image_info(extent);

        // SAFETY: The device is live and image_info is valid.
        let image = unsafe { device.handle().create_image(&image_info, None)? };

        // SAFETY: image was just created on this device.
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = device.lock_allocator().and_then(|mut allocator| {
            allocator
                .allocate(&AllocationCreateDesc {
                    name: "depth_image",
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(RhiError::from)
        });

        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                // SAFETY: The image has no memory bound and is unused.
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e);
            }
        };

        // SAFETY: The allocation satisfies the image's requirements.
        unsafe {
            device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())?;
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        // SAFETY: The image is bound to memory and matches the view format.
        let view = unsafe { device.handle().create_image_view(&view_info, None)? };

        info!(
            "Created depth image: {}x{} ({:?})",
            extent.width, extent.height, DEPTH_FORMAT
        );

        Ok(Self {
            device,
            image,
            view,
            allocation: Some(allocation),
            extent,
        })
    }

    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        DEPTH_FORMAT
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for DepthImage {
    fn drop(&mut self) {
        // SAFETY: Framebuffers referencing the view are destroyed first and
        // the device is idle.
        unsafe {
            self.device.handle().destroy_image_view(self.view, None);
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take() {
            match self.device.lock_allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        error!("Failed to free depth image allocation: {:?}", e);
                    }
                }
                Err(e) => error!("Leaking depth image allocation: {}", e),
            }
        }

        debug!("Destroyed depth image");
    }
}

fn depth_image_info(extent: vk::Extent2D) -> vk::ImageCreateInfo<'static> {
    vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(DEPTH_FORMAT)
        .extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
}
