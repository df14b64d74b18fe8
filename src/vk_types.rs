pub mod buffers;
pub mod mesh;
pub mod push_constants;
pub mod vertex;

use ash::extensions::khr::Swapchain;
use ash::{vk, Device};
use gpu_allocator::vulkan::{Allocation, Allocator};
use std::mem::ManuallyDrop;

use crate::vk_types::buffers::AllocatedBuffer;

/// Device-level objects every destructor needs.
pub struct GpuContext {
    pub device: Device,
    pub swapchain_loader: Swapchain,
    /// Dropped explicitly before the device is destroyed.
    pub allocator: ManuallyDrop<Allocator>,
}

impl GpuContext {
    pub fn destroy_buffer(&mut self, buffer: AllocatedBuffer) {
        if let Err(e) = self.allocator.free(buffer.allocation) {
            log::error!("failed to free buffer memory: {e}");
        }
        unsafe { self.device.destroy_buffer(buffer.buffer, None) };
    }

    pub fn destroy_image(&mut self, image: AllocatedImage) {
        unsafe { self.device.destroy_image_view(image.image_view, None) };
        if let Err(e) = self.allocator.free(image.allocation) {
            log::error!("failed to free image memory: {e}");
        }
        unsafe { self.device.destroy_image(image.image, None) };
    }
}

pub struct AllocatedImage {
    pub image: vk::Image,
    pub image_view: vk::ImageView,
    pub allocation: Allocation,
}
