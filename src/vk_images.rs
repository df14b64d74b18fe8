use crate::error::EngineResult;
use crate::vk_init;
use crate::vk_types::AllocatedImage;
use ash::{vk, Device};
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;

//hardcoding the depth format to 32 bit float
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Creates a device-local depth buffer matching `extent`, with its view.
pub fn create_depth_image(
    device: &Device,
    allocator: &mut Allocator,
    extent: vk::Extent2D,
) -> EngineResult<AllocatedImage> {
    let depth_image_extent = vk::Extent3D {
        width: extent.width,
        height: extent.height,
        depth: 1,
    };
    let depth_image_create_info = vk_init::image_create_info(
        DEPTH_FORMAT,
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        depth_image_extent,
    );
    let depth_image = unsafe { device.create_image(&depth_image_create_info, None)? };
    let requirements = unsafe { device.get_image_memory_requirements(depth_image) };

    let allocation = match allocator.allocate(&AllocationCreateDesc {
        name: "depth_image_allocation",
        requirements,
        location: MemoryLocation::GpuOnly,
        linear: false,
        allocation_scheme: AllocationScheme::DedicatedImage(depth_image),
    }) {
        Ok(allocation) => allocation,
        Err(e) => {
            unsafe { device.destroy_image(depth_image, None) };
            return Err(e.into());
        }
    };

    //build a image-view for the depth image to use for rendering
    let depth_image_view_create_info =
        vk_init::image_view_create_info(DEPTH_FORMAT, depth_image, vk::ImageAspectFlags::DEPTH);
    let view = unsafe {
        device
            .bind_image_memory(depth_image, allocation.memory(), allocation.offset())
            .and_then(|()| device.create_image_view(&depth_image_view_create_info, None))
    };
    let depth_image_view = match view {
        Ok(view) => view,
        Err(e) => {
            if let Err(free_error) = allocator.free(allocation) {
                log::error!("failed to free depth image memory: {free_error}");
            }
            unsafe { device.destroy_image(depth_image, None) };
            return Err(e.into());
        }
    };

    Ok(AllocatedImage {
        image: depth_image,
        image_view: depth_image_view,
        allocation,
    })
}
