//! Vulkan instance management.
//!
//! This module handles VkInstance creation, validation layers, and the debug
//! messenger that forwards validation output into `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use manaburn_core::EngineConfig;
//! use manaburn_rhi::instance::Instance;
//!
//! let config = EngineConfig::default();
//! // Surface extensions normally come from the platform layer.
//! let instance = Instance::new(&config, &[]).expect("Failed to create Vulkan instance");
//! let vk_instance = instance.handle();
//! ```

use std::ffi::{CStr, c_char};

use ash::{Entry, vk};
use manaburn_core::EngineConfig;
use tracing::{error, info, warn};

use crate::error::RhiError;

/// Extensions every instance needs regardless of platform.
const BASE_INSTANCE_EXTENSIONS: &[&CStr] = &[c"VK_KHR_get_physical_device_properties2"];

/// Vulkan instance wrapper with optional validation layer support.
///
/// Owns the entry loader, the instance and the debug messenger. When dropped,
/// the messenger is destroyed before the instance.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Debug utils extension loader (only present when validation is enabled)
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    /// Debug messenger handle (only present when validation is enabled)
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration (application name, validation toggle and layers)
    /// * `surface_extensions` - Platform surface extensions reported by the window system
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Vulkan library cannot be loaded
    /// - Instance creation fails
    /// - Debug messenger setup fails (when validation is enabled)
    pub fn new(config: &EngineConfig, surface_extensions: &[*const c_char]) -> Result<Self, RhiError> {
        // SAFETY: Loading the Vulkan library has no preconditions beyond the
        // library being well-formed; failures surface as LoadingError.
        let entry = unsafe { Entry::load()? };

        let validation_available = config.enable_validation()
            && Self::are_layers_available(&entry, config.validation_layers())?;
        if config.enable_validation() && !validation_available {
            warn!("Validation layers requested but not available, proceeding without them");
        }

        let application_name = std::ffi::CString::new(config.application_name())
            .map_err(|e| RhiError::InvalidHandle(format!("application name: {}", e)))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(vk::make_api_version(0, 1, 2, 0))
            .engine_name(c"Manaburn")
            .engine_version(vk::make_api_version(0, 1, 2, 0))
            .api_version(vk::API_VERSION_1_2);

        let extensions = instance_extensions(surface_extensions, validation_available);
        let layers: Vec<*const c_char> = if validation_available {
            config
                .validation_layers()
                .iter()
                .map(|layer| layer.as_ptr())
                .collect()
        } else {
            Vec::new()
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        // SAFETY: All pointers in create_info reference data that outlives this call.
        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!("Vulkan instance created (API version 1.2)");

        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = Self::setup_debug_messenger(&debug_utils)?;
            info!("Validation layers enabled, debug messenger created");
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are enabled.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Checks that every requested layer is installed.
    fn are_layers_available(entry: &Entry, requested: &[&CStr]) -> Result<bool, RhiError> {
        // SAFETY: Enumerating layers has no preconditions.
        let available = unsafe { entry.enumerate_instance_layer_properties()? };

        Ok(requested.iter().all(|wanted| {
            available
                .iter()
                .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == *wanted))
        }))
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        // SAFETY: The debug utils loader was created from a live instance.
        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };

        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // SAFETY: Every object created from this instance has been destroyed by
        // its owner before the instance is dropped.
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Full instance extension list: platform surface extensions, the base
/// extensions, and debug utils when validation is on.
fn instance_extensions(surface_extensions: &[*const c_char], validation: bool) -> Vec<*const c_char> {
    let mut extensions = surface_extensions.to_vec();
    extensions.extend(BASE_INSTANCE_EXTENSIONS.iter().map(|ext| ext.as_ptr()));
    if validation {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    extensions
}

/// Log label for a message type.
fn message_type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    }
}

/// Forwards validation messages into `tracing`.
///
/// Only warnings and errors are reported; verbose and info output is dropped.
///
/// # Safety
///
/// Called by the Vulkan loader with a valid (or null) callback data pointer.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let type_str = message_type_label(message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("[Vulkan {}] {}", type_str, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("[Vulkan {}] {}", type_str, message);
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_extensions_without_validation() {
        let surface = [ash::khr::surface::NAME.as_ptr()];
        let extensions = instance_extensions(&surface, false);

        assert_eq!(extensions.len(), 1 + BASE_INSTANCE_EXTENSIONS.len());
        assert_eq!(extensions[0], ash::khr::surface::NAME.as_ptr());
        assert!(!extensions.contains(&ash::ext::debug_utils::NAME.as_ptr()));
    }

    #[test]
    fn test_instance_extensions_with_validation() {
        let extensions = instance_extensions(&[], true);
        assert_eq!(
            extensions.last().copied(),
            Some(ash::ext::debug_utils::NAME.as_ptr())
        );
    }

    #[test]
    fn test_message_type_label() {
        assert_eq!(
            message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION),
            "Validation"
        );
        assert_eq!(
            message_type_label(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            ),
            "Unknown"
        );
    }

    #[test]
    fn test_debug_callback_ignores_null_data() {
        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }
}
