//! Physical device (GPU) selection and extension negotiation.
//!
//! Selection works in three passes:
//! 1. Enumerate all available GPUs
//! 2. Reject GPUs missing a graphics or present queue family, or any
//!    required device extension
//! 3. Pick the highest rated GPU (discrete preferred)
//!
//! Extension negotiation yields one [`ExtensionSupport`] per requested
//! extension so that consumers match on the outcome instead of querying
//! function pointers at call sites.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;

/// Negotiated availability of one device extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionSupport {
    Supported(&'static CStr),
    Unsupported(&'static CStr),
}

impl ExtensionSupport {
    pub fn name(&self) -> &'static CStr {
        match self {
            ExtensionSupport::Supported(name) | ExtensionSupport::Unsupported(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, ExtensionSupport::Supported(_))
    }
}

/// Outcome of negotiating a list of device extensions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionReport {
    entries: Vec<ExtensionSupport>,
}

impl ExtensionReport {
    /// True when every requested extension is supported.
    pub fn all_supported(&self) -> bool {
        self.entries.iter().all(ExtensionSupport::is_supported)
    }

    /// Look up the outcome for one extension. Extensions never requested
    /// report as unsupported.
    pub fn get(&self, name: &'static CStr) -> ExtensionSupport {
        self.entries
            .iter()
            .copied()
            .find(|entry| entry.name() == name)
            .unwrap_or(ExtensionSupport::Unsupported(name))
    }

    /// Names of the supported extensions, ready for `VkDeviceCreateInfo`.
    pub fn enabled_names(&self) -> Vec<*const std::ffi::c_char> {
        self.entries
            .iter()
            .filter(|entry| entry.is_supported())
            .map(|entry| entry.name().as_ptr())
            .collect()
    }

    pub fn missing(&self) -> impl Iterator<Item = &'static CStr> + '_ {
        self.entries
            .iter()
            .filter(|entry| !entry.is_supported())
            .map(ExtensionSupport::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionSupport> {
        self.entries.iter()
    }
}

/// Match each required extension against the names a device advertises.
pub fn negotiate_extensions(required: &[&'static CStr], available: &[&CStr]) -> ExtensionReport {
    let entries = required
        .iter()
        .map(|&name| {
            if available.contains(&name) {
                ExtensionSupport::Supported(name)
            } else {
                ExtensionSupport::Unsupported(name)
            }
        })
        .collect();
    ExtensionReport { entries }
}

/// Queue family indices the engine needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Index of the first queue family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Index of the first queue family that can present to the surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Graphics and present families, deduplicated.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }

    /// True when graphics and present live in different families, which
    /// makes swapchain images concurrently shared.
    pub fn is_split(&self) -> bool {
        self.graphics_family != self.present_family
    }
}

/// Information about the selected physical device.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
    /// Result of negotiating the configured device extensions.
    pub extensions: ExtensionReport,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        self.properties
            .device_name_as_c_str()
            .ok()
            .and_then(|name| name.to_str().ok())
            .unwrap_or("Unknown Device")
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }

    /// Returns the total device local memory in bytes.
    pub fn device_local_memory(&self) -> u64 {
        self.memory_properties
            .memory_heaps
            .iter()
            .take(self.memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("queue_families", &self.queue_families)
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Selects the most suitable physical device for rendering.
///
/// # Arguments
///
/// * `instance` - The Vulkan instance
/// * `surface` - The window surface for present support checking
/// * `surface_loader` - The surface extension loader
/// * `required_extensions` - Device extensions a GPU must support
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no GPU has both queue families and
/// every required extension. There is no fallback.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
    required_extensions: &[&'static CStr],
) -> Result<PhysicalDeviceInfo, RhiError> {
    // SAFETY: The instance is live for the duration of this call.
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let mut suitable_devices: Vec<(PhysicalDeviceInfo, u32)> = Vec::new();

    for device in devices {
        if let Some(info) = check_device_suitability(
            instance,
            device,
            surface,
            surface_loader,
            required_extensions,
        )? {
            let score = rate_device(&info);
            debug!(
                "GPU '{}' ({}) - Score: {}",
                info.device_name(),
                info.device_type_name(),
                score
            );
            suitable_devices.push((info, score));
        }
    }

    let (selected_device, score) = suitable_devices
        .into_iter()
        .max_by_key(|(_, score)| *score)
        .ok_or_else(|| {
            warn!("No suitable GPU found with required capabilities");
            RhiError::NoSuitableGpu
        })?;

    info!(
        "Selected GPU: '{}' ({}) - Score: {}",
        selected_device.device_name(),
        selected_device.device_type_name(),
        score
    );

    Ok(selected_device)
}

/// Returns `Some(PhysicalDeviceInfo)` if the device meets all requirements.
fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
    required_extensions: &[&'static CStr],
) -> Result<Option<PhysicalDeviceInfo>, RhiError> {
    // SAFETY: `device` was enumerated from this instance.
    let (properties, memory_properties, families, extension_properties) = unsafe {
        (
            instance.get_physical_device_properties(device),
            instance.get_physical_device_memory_properties(device),
            instance.get_physical_device_queue_family_properties(device),
            instance.enumerate_device_extension_properties(device)?,
        )
    };

    let device_name = properties
        .device_name_as_c_str()
        .ok()
        .and_then(|name| name.to_str().ok())
        .unwrap_or("Unknown")
        .to_string();

    let queue_families = pick_queue_families(&families, |index| {
        // SAFETY: `index` is a valid family index of `device`.
        unsafe {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .unwrap_or(false)
        }
    });

    if !queue_families.is_complete() {
        debug!(
            "GPU '{}' skipped: missing required queue families (graphics={}, present={})",
            device_name,
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        return Ok(None);
    }

    let available: Vec<&CStr> = extension_properties
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .collect();
    let extensions = negotiate_extensions(required_extensions, &available);

    if !extensions.all_supported() {
        for missing in extensions.missing() {
            debug!("GPU '{}' skipped: missing extension {:?}", device_name, missing);
        }
        return Ok(None);
    }

    Ok(Some(PhysicalDeviceInfo {
        device,
        properties,
        memory_properties,
        queue_families,
        extensions,
    }))
}

/// Pick the first graphics-capable family and the first present-capable family.
fn pick_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in families.iter().enumerate() {
        let i = i as u32;

        if family.queue_count == 0 {
            continue;
        }

        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(i);
        }

        if indices.present_family.is_none() && supports_present(i) {
            indices.present_family = Some(i);
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

/// Higher scores indicate more desirable devices.
fn rate_device(info: &PhysicalDeviceInfo) -> u32 {
    let mut score = match info.properties.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 10000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 100,
        vk::PhysicalDeviceType::CPU => 10,
        _ => 1,
    };

    score += info.properties.limits.max_image_dimension2_d;

    let vram_mb = (info.device_local_memory() / (1024 * 1024)) as u32;
    score += vram_mb.min(16000);

    score
}
