use ash::extensions::khr::{Surface, Swapchain};
use ash::{vk, Device};

use crate::error::{EngineError, EngineResult};
use crate::vk_bootstrap::create_all;
use crate::vk_init;

/// What the engine asks for; the surface decides what it gets.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainRequest {
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    /// Format to keep across recreations so the renderpass stays compatible.
    pub format: Option<vk::SurfaceFormatKHR>,
    pub old_swapchain: vk::SwapchainKHR,
}

pub struct SwapchainBundle {
    pub swapchain: vk::SwapchainKHR,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
}

pub fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    keep: Option<vk::SurfaceFormatKHR>,
) -> Option<vk::SurfaceFormatKHR> {
    let preferred = [
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];
    keep.into_iter()
        .chain(preferred)
        .find(|wanted| available.contains(wanted))
        .or_else(|| available.first().copied())
}

pub fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    desired: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    if available.contains(&desired) {
        desired
    } else {
        // FIFO is the only mode every implementation must support
        vk::PresentModeKHR::FIFO
    }
}

/// `None` while the surface has no area, e.g. a minimized window.
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, desired: vk::Extent2D) -> Option<vk::Extent2D> {
    let extent = match capabilities.current_extent.width {
        u32::MAX => vk::Extent2D {
            width: desired.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        },
        _ => capabilities.current_extent,
    };
    (extent.width > 0 && extent.height > 0).then_some(extent)
}

/// Extent a swapchain created right now would get.
pub fn surface_extent(
    physical_device: vk::PhysicalDevice,
    surface_loader: &Surface,
    surface: vk::SurfaceKHR,
    desired: vk::Extent2D,
) -> EngineResult<Option<vk::Extent2D>> {
    let capabilities = unsafe {
        surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
    };
    Ok(choose_extent(&capabilities, desired))
}

pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired_image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && desired_image_count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        desired_image_count
    }
}

pub fn choose_composite_alpha(
    supported: vk::CompositeAlphaFlagsKHR,
    desired: vk::CompositeAlphaFlagsKHR,
) -> vk::CompositeAlphaFlagsKHR {
    if supported.contains(desired) {
        return desired;
    }
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ]
    .into_iter()
    .find(|&mode| supported.contains(mode))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

pub fn create_swapchain(
    device: &Device,
    physical_device: vk::PhysicalDevice,
    surface_loader: &Surface,
    swapchain_loader: &Swapchain,
    surface: vk::SurfaceKHR,
    request: &SwapchainRequest,
) -> EngineResult<SwapchainBundle> {
    let capabilities = unsafe {
        surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
    };
    let formats = unsafe { surface_loader.get_physical_device_surface_formats(physical_device, surface)? };
    let present_modes = unsafe {
        surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
    };

    let format = choose_surface_format(&formats, request.format).ok_or(EngineError::NoSurfaceFormat)?;
    let present_mode = choose_present_mode(&present_modes, request.present_mode);
    let extent = choose_extent(&capabilities, request.extent).ok_or(EngineError::ZeroExtent)?;
    let composite_alpha = choose_composite_alpha(capabilities.supported_composite_alpha, request.composite_alpha);
    log::info!(
        "Creating swapchain {}x{} {:?} {:?} {:?}",
        extent.width,
        extent.height,
        format.format,
        present_mode,
        composite_alpha
    );

    let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface)
        .min_image_count(choose_image_count(&capabilities))
        .image_format(format.format)
        .image_color_space(format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(composite_alpha)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(request.old_swapchain);
    let swapchain = unsafe { swapchain_loader.create_swapchain(&swapchain_create_info, None)? };

    let views = unsafe { swapchain_loader.get_swapchain_images(swapchain) }
        .map_err(EngineError::from)
        .and_then(|images| {
            let image_views = create_all(
                images.iter(),
                |&image| {
                    let view_info = vk_init::image_view_create_info(format.format, image, vk::ImageAspectFlags::COLOR);
                    Ok(unsafe { device.create_image_view(&view_info, None)? })
                },
                |view| unsafe { device.destroy_image_view(view, None) },
            )?;
            Ok((images, image_views))
        });
    let (images, image_views) = match views {
        Ok(views) => views,
        Err(e) => {
            unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
            return Err(e);
        }
    };

    Ok(SwapchainBundle {
        swapchain,
        format,
        extent,
        images,
        image_views,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn srgb_formats_are_preferred() {
        let available = [
            surface_format(vk::Format::R8G8B8A8_UNORM),
            surface_format(vk::Format::R8G8B8A8_SRGB),
        ];
        assert_eq!(
            choose_surface_format(&available, None),
            Some(surface_format(vk::Format::R8G8B8A8_SRGB))
        );
        let unorm_only = [surface_format(vk::Format::R5G6B5_UNORM_PACK16)];
        assert_eq!(choose_surface_format(&unorm_only, None), Some(unorm_only[0]));
        assert_eq!(choose_surface_format(&[], None), None);
    }

    #[test]
    fn previous_format_wins_when_still_available() {
        let available = [
            surface_format(vk::Format::B8G8R8A8_SRGB),
            surface_format(vk::Format::R8G8B8A8_UNORM),
        ];
        let kept = surface_format(vk::Format::R8G8B8A8_UNORM);
        assert_eq!(choose_surface_format(&available, Some(kept)), Some(kept));
    }

    #[test]
    fn present_mode_falls_back_to_fifo() {
        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(
            choose_present_mode(&available, vk::PresentModeKHR::MAILBOX),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&available, vk::PresentModeKHR::IMMEDIATE),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn fixed_surface_extent_wins() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 1080, height: 2340 },
            ..Default::default()
        };
        let extent = choose_extent(&capabilities, vk::Extent2D { width: 1700, height: 900 });
        assert_eq!(extent, Some(vk::Extent2D { width: 1080, height: 2340 }));
    }

    #[test]
    fn undefined_extent_is_clamped() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 1600, height: 1200 },
            ..Default::default()
        };
        let extent = choose_extent(&capabilities, vk::Extent2D { width: 1700, height: 900 });
        assert_eq!(extent, Some(vk::Extent2D { width: 1600, height: 900 }));
    }

    #[test]
    fn minimized_surface_has_no_extent() {
        // the surface shrinks to nothing while the drawable size still reports the old window
        let minimized = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 0, height: 0 },
            min_image_extent: vk::Extent2D { width: 0, height: 0 },
            max_image_extent: vk::Extent2D { width: 0, height: 0 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&minimized, vk::Extent2D { width: 1700, height: 900 }), None);

        let collapsed = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 1080, height: 0 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&collapsed, vk::Extent2D { width: 1700, height: 900 }), None);

        let undefined = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 0, height: 0 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&undefined, vk::Extent2D { width: 0, height: 900 }), None);
    }

    #[test]
    fn image_count_respects_maximum() {
        let mut capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&capabilities), 3);
        capabilities.max_image_count = 2;
        assert_eq!(choose_image_count(&capabilities), 2);
    }

    #[test]
    fn composite_alpha_prefers_request() {
        let android_like = vk::CompositeAlphaFlagsKHR::INHERIT | vk::CompositeAlphaFlagsKHR::OPAQUE;
        assert_eq!(
            choose_composite_alpha(android_like, vk::CompositeAlphaFlagsKHR::INHERIT),
            vk::CompositeAlphaFlagsKHR::INHERIT
        );
        let desktop_like = vk::CompositeAlphaFlagsKHR::OPAQUE;
        assert_eq!(
            choose_composite_alpha(desktop_like, vk::CompositeAlphaFlagsKHR::INHERIT),
            vk::CompositeAlphaFlagsKHR::OPAQUE
        );
        assert_eq!(
            choose_composite_alpha(vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED, vk::CompositeAlphaFlagsKHR::INHERIT),
            vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED
        );
    }
}
