use ash::{vk, Entry};
use std::borrow::Cow;
use std::ffi::{c_void, CStr};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let callback_data = &*p_callback_data;
    let message = if callback_data.p_message.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[{:?}] {}", message_type, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[{:?}] {}", message_type, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            log::info!("[{:?}] {}", message_type, message)
        }
        _ => log::debug!("[{:?}] {}", message_type, message),
    }
    vk::FALSE
}

pub fn layer_available(entry: &Entry, layer: &CStr) -> bool {
    entry
        .enumerate_instance_layer_properties()
        .map(|layers| {
            layers
                .iter()
                .any(|lp| unsafe { CStr::from_ptr(lp.layer_name.as_ptr()) } == layer)
        })
        .unwrap_or(false)
}

/// Dumps the instance layers and extensions the loader exposes.
pub fn log_layers_and_extensions(entry: &Entry) {
    match entry.enumerate_instance_layer_properties() {
        Ok(layers) => {
            log::debug!("{} instance layers:", layers.len());
            for layer in &layers {
                let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
                let description = unsafe { CStr::from_ptr(layer.description.as_ptr()) };
                log::debug!("  {:?}: {:?}", name, description);
            }
        }
        Err(e) => log::warn!("could not enumerate instance layers: {e}"),
    }
    match entry.enumerate_instance_extension_properties(None) {
        Ok(extensions) => {
            log::debug!("{} instance extensions:", extensions.len());
            for extension in &extensions {
                let name = unsafe { CStr::from_ptr(extension.extension_name.as_ptr()) };
                log::debug!("  {:?} (spec {})", name, extension.spec_version);
            }
        }
        Err(e) => log::warn!("could not enumerate instance extensions: {e}"),
    }
}
