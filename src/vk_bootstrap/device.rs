use ash::extensions::khr::{Surface, Swapchain};
use ash::{vk, Instance};
use std::ffi::CStr;

use crate::error::{EngineError, EngineResult};

pub const MINIMUM_API_VERSION: u32 = vk::make_api_version(0, 1, 1, 0);

/// Picks the best GPU that can draw to `surface`, together with the queue family to use.
pub fn pick_physical_device_and_queue(
    instance: &Instance,
    surface_loader: &Surface,
    surface: vk::SurfaceKHR,
) -> EngineResult<(vk::PhysicalDevice, u32)> {
    let physical_devices = unsafe { instance.enumerate_physical_devices()? };
    log::debug!("{} devices (GPU) found with vulkan support.", physical_devices.len());

    let mut best: Option<(u32, vk::PhysicalDevice, u32)> = None;
    for &physical_device in physical_devices.iter() {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
        if properties.api_version < MINIMUM_API_VERSION {
            log::debug!("skipping {:?}: Vulkan 1.1 not supported", name);
            continue;
        }
        if !swapchain_supported(instance, physical_device)? {
            log::debug!("skipping {:?}: no {:?}", name, Swapchain::name());
            continue;
        }
        let families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let queue_family = find_graphics_present_queue(&families, |index| unsafe {
            surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
                .unwrap_or(false)
        });
        let Some(queue_family) = queue_family else {
            log::debug!("skipping {:?}: no queue can draw and present", name);
            continue;
        };
        let rank = device_type_rank(properties.device_type);
        if best.map_or(true, |(best_rank, _, _)| rank > best_rank) {
            best = Some((rank, physical_device, queue_family));
        }
    }

    let (_, physical_device, queue_family) = best.ok_or(EngineError::NoSuitableDevice)?;
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    log::info!(
        "Using GPU {:?} ({:?}), queue family {}",
        unsafe { CStr::from_ptr(properties.device_name.as_ptr()) },
        properties.device_type,
        queue_family
    );
    Ok((physical_device, queue_family))
}

/// First queue family that supports graphics and can present.
pub fn find_graphics_present_queue(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: impl FnMut(u32) -> bool,
) -> Option<u32> {
    families
        .iter()
        .enumerate()
        .filter(|(_, family)| {
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|(index, _)| index as u32)
        .find(|&index| supports_present(index))
}

/// Higher is better: discrete GPUs first, CPU implementations last.
pub fn device_type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

fn swapchain_supported(instance: &Instance, physical_device: vk::PhysicalDevice) -> EngineResult<bool> {
    let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device)? };
    Ok(extensions
        .iter()
        .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == Swapchain::name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn graphics_queue_must_also_present() {
        let families = [
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        assert_eq!(find_graphics_present_queue(&families, |_| true), Some(1));
        assert_eq!(find_graphics_present_queue(&families, |i| i == 2), Some(2));
        assert_eq!(find_graphics_present_queue(&families, |i| i == 0), None);
    }

    #[test]
    fn empty_families_are_skipped() {
        let families = [family(vk::QueueFlags::GRAPHICS, 0), family(vk::QueueFlags::GRAPHICS, 4)];
        assert_eq!(find_graphics_present_queue(&families, |_| true), Some(1));
    }

    #[test]
    fn discrete_beats_integrated() {
        assert!(
            device_type_rank(vk::PhysicalDeviceType::DISCRETE_GPU)
                > device_type_rank(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
        assert!(
            device_type_rank(vk::PhysicalDeviceType::CPU)
                > device_type_rank(vk::PhysicalDeviceType::OTHER)
        );
    }

    #[test]
    fn minimum_version_is_1_1() {
        assert!(vk::make_api_version(0, 1, 0, 61) < MINIMUM_API_VERSION);
        assert!(vk::make_api_version(0, 1, 3, 0) >= MINIMUM_API_VERSION);
    }
}
