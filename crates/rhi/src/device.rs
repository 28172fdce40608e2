//! Vulkan logical device and queue management.
//!
//! This module handles VkDevice creation, queue retrieval, gpu-allocator
//! initialization and queue submission.
//!
//! # Example
//!
//! ```no_run
//! use manaburn_core::EngineConfig;
//! use manaburn_rhi::instance::Instance;
//! use manaburn_rhi::physical_device::select_physical_device;
//! use manaburn_rhi::device::Device;
//! use ash::vk;
//!
//! let config = EngineConfig::default();
//! let instance = Instance::new(&config, &[]).expect("Failed to create instance");
//! let surface: vk::SurfaceKHR = vk::SurfaceKHR::null(); // placeholder
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//!
//! let physical_device_info = select_physical_device(
//!     instance.handle(),
//!     surface,
//!     &surface_loader,
//!     config.device_extensions(),
//! )
//! .expect("No suitable GPU found");
//!
//! let device = Device::new(&instance, &physical_device_info)
//!     .expect("Failed to create logical device");
//! let graphics_queue = device.graphics_queue();
//! ```

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, info};

use crate::error::RhiError;
use crate::instance::Instance;
use crate::physical_device::{
    ExtensionSupport, PhysicalDeviceInfo, QueueFamilyIndices,
};

/// One semaphore dependency of a queue submission.
#[derive(Clone, Copy, Debug)]
pub struct SemaphoreStage {
    pub semaphore: vk::Semaphore,
    pub stage: vk::PipelineStageFlags2,
}

/// A single command buffer submission with one wait and one signal semaphore.
#[derive(Clone, Copy, Debug)]
pub struct GraphicsSubmit {
    pub command_buffer: vk::CommandBuffer,
    pub wait: SemaphoreStage,
    pub signal: SemaphoreStage,
}

/// Vulkan logical device wrapper.
///
/// Owns the logical device, its queues, the memory allocator and the
/// extension loaders selected during negotiation.
///
/// # Thread Safety
///
/// The [`Device`] is shared through `Arc`. The allocator is protected by a
/// `Mutex`; all other state is immutable after creation.
pub struct Device {
    /// Vulkan logical device handle.
    device: ash::Device,
    /// Physical device handle.
    physical_device: vk::PhysicalDevice,
    /// GPU memory allocator, dropped before the device is destroyed.
    allocator: ManuallyDrop<Mutex<Allocator>>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilyIndices,
    /// synchronization2 entry points, present only when negotiated.
    synchronization2: Option<ash::khr::synchronization2::Device>,
}

impl Device {
    /// Creates a new logical device.
    ///
    /// Enables the extensions negotiated in `physical_device_info`, turns on
    /// the `synchronization2` feature when that extension is supported, and
    /// initializes gpu-allocator.
    ///
    /// # Arguments
    ///
    /// * `instance` - The Vulkan instance
    /// * `physical_device_info` - The selected physical device
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The queue families are incomplete
    /// - Device creation fails
    /// - Allocator initialization fails
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> Result<Arc<Self>, RhiError> {
        let queue_families = physical_device_info.queue_families;
        let (graphics_family, present_family) = match (
            queue_families.graphics_family,
            queue_families.present_family,
        ) {
            (Some(graphics), Some(present)) => (graphics, present),
            _ => return Err(RhiError::NoSuitableGpu),
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let extensions = &physical_device_info.extensions;
        let extension_names = extensions.enabled_names();
        let sync2_supported = extensions
            .get(ash::khr::synchronization2::NAME)
            .is_supported();

        let mut sync2_features =
            vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true);

        let mut create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names);
        if sync2_supported {
            create_info = create_info.push_next(&mut sync2_features);
        }

        // SAFETY: All pointers in create_info reference locals that outlive the call.
        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            extension_names.len()
        );

        // SAFETY: Both families were requested with one queue each.
        let (graphics_queue, present_queue) = unsafe {
            (
                device.get_device_queue(graphics_family, 0),
                device.get_device_queue(present_family, 0),
            )
        };
        debug!(
            "Queues retrieved: graphics family {}, present family {}",
            graphics_family, present_family
        );

        let synchronization2 = match extensions.get(ash::khr::synchronization2::NAME) {
            ExtensionSupport::Supported(_) => Some(ash::khr::synchronization2::Device::new(
                instance.handle(),
                &device,
            )),
            ExtensionSupport::Unsupported(_) => None,
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: physical_device_info.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })?;

        info!("GPU memory allocator initialized");

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            present_queue,
            queue_families,
            synchronization2,
        }))
    }

    /// Returns the Vulkan logical device handle.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Returns a reference to the GPU memory allocator.
    #[inline]
    pub fn allocator(&self) -> &Mutex<Allocator> {
        &self.allocator
    }

    /// Locks the allocator for one allocation or free.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::InvalidHandle`] if a previous holder panicked.
    pub fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>, RhiError> {
        self.allocator
            .lock()
            .map_err(|_| RhiError::InvalidHandle("GPU allocator mutex poisoned".to_string()))
    }

    /// Waits for the device to become idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails (typically device lost).
    pub fn wait_idle(&self) -> Result<(), RhiError> {
        // SAFETY: The device is live.
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits one command buffer to the graphics queue.
    ///
    /// Uses `vkQueueSubmit2` when synchronization2 was negotiated, so both
    /// the wait and the signal stage are honored. Without it, the legacy
    /// submit path applies the wait stage and signals at end of pipe.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - The command buffer is fully recorded
    /// - The fence is unsignaled and not in use by another submission
    ///
    /// # Errors
    ///
    /// Returns an error if the submission fails.
    pub unsafe fn submit_graphics(
        &self,
        submit: &GraphicsSubmit,
        fence: vk::Fence,
    ) -> Result<(), RhiError> {
        match &self.synchronization2 {
            Some(sync2) => {
                let wait_infos = [vk::SemaphoreSubmitInfo::default()
                    .semaphore(submit.wait.semaphore)
                    .stage_mask(submit.wait.stage)];
                let signal_infos = [vk::SemaphoreSubmitInfo::default()
                    .semaphore(submit.signal.semaphore)
                    .stage_mask(submit.signal.stage)];
                let command_infos =
                    [vk::CommandBufferSubmitInfo::default().command_buffer(submit.command_buffer)];

                let submit_info = vk::SubmitInfo2::default()
                    .wait_semaphore_infos(&wait_infos)
                    .signal_semaphore_infos(&signal_infos)
                    .command_buffer_infos(&command_infos);

                unsafe { sync2.queue_submit2(self.graphics_queue, &[submit_info], fence)? };
            }
            None => {
                let wait_semaphores = [submit.wait.semaphore];
                let wait_stages = [legacy_stage(submit.wait.stage)];
                let signal_semaphores = [submit.signal.semaphore];
                let command_buffers = [submit.command_buffer];

                let submit_info = vk::SubmitInfo::default()
                    .wait_semaphores(&wait_semaphores)
                    .wait_dst_stage_mask(&wait_stages)
                    .command_buffers(&command_buffers)
                    .signal_semaphores(&signal_semaphores);

                unsafe {
                    self.device
                        .queue_submit(self.graphics_queue, &[submit_info], fence)?
                };
            }
        }
        Ok(())
    }
}

/// Narrow a synchronization2 stage mask to the legacy 32-bit flags.
fn legacy_stage(stage: vk::PipelineStageFlags2) -> vk::PipelineStageFlags {
    vk::PipelineStageFlags::from_raw(stage.as_raw() as u32)
}

impl Drop for Device {
    fn drop(&mut self) {
        // SAFETY: Every object created from this device has been destroyed by
        // its owner; the allocator is freed before the device itself.
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("Failed to wait for device idle during drop: {:?}", e);
            }

            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// SAFETY: ash::Device and the extension loaders are plain function tables,
// queue and physical device handles are Copy, and the allocator is behind a Mutex.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_stage_narrowing() {
        assert_eq!(
            legacy_stage(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT),
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(
            legacy_stage(vk::PipelineStageFlags2::ALL_GRAPHICS),
            vk::PipelineStageFlags::ALL_GRAPHICS
        );
    }

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
