use ash::{vk, Device};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;

use crate::error::{EngineError, EngineResult};

pub struct AllocatedBuffer {
    pub buffer: vk::Buffer,
    pub allocation: Allocation,
}

pub fn create_buffer(
    device: &Device,
    allocator: &mut Allocator,
    name: &str,
    allocation_size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    memory_location: MemoryLocation,
) -> EngineResult<AllocatedBuffer> {
    let buffer_info = vk::BufferCreateInfo::builder()
        .size(allocation_size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = unsafe { device.create_buffer(&buffer_info, None)? };
    let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

    let allocation = match allocator.allocate(&AllocationCreateDesc {
        name,
        requirements,
        location: memory_location,
        linear: true,
        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
    }) {
        Ok(allocation) => allocation,
        Err(e) => {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(e.into());
        }
    };

    if let Err(e) = unsafe { device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) } {
        if let Err(free_error) = allocator.free(allocation) {
            log::error!("failed to free buffer memory: {free_error}");
        }
        unsafe { device.destroy_buffer(buffer, None) };
        return Err(e.into());
    }

    Ok(AllocatedBuffer { buffer, allocation })
}

impl AllocatedBuffer {
    /// Copies `bytes` to the start of a host-visible buffer.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> EngineResult<()> {
        let mapped = self
            .allocation
            .mapped_slice_mut()
            .ok_or(EngineError::NotMapped("vertex buffer"))?;
        mapped[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
