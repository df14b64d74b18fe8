use ash::{vk, Device};
use crate::vk_engine::VulkanEngine;

#[derive(Default, Debug, Clone, Copy)]
pub struct FrameData {
    pub command_pool : vk::CommandPool,
    pub main_command_buffer : vk::CommandBuffer,
    /// Signaled by the swapchain when the acquired image can be drawn to.
    pub present_semaphore : vk::Semaphore,
    /// Signaled when the GPU is done with this frame's command buffer.
    pub render_fence : vk::Fence
}

impl FrameData {
    /// The command buffer is freed together with its pool.
    pub unsafe fn destroy(&self, device: &Device) {
        device.destroy_command_pool(self.command_pool, None);
        device.destroy_fence(self.render_fence, None);
        device.destroy_semaphore(self.present_semaphore, None);
    }
}

pub fn frame_slot(frame_number: u64, frames_in_flight: usize) -> usize {
    (frame_number % frames_in_flight as u64) as usize
}

impl VulkanEngine {
    pub fn get_current_frame(&self) -> FrameData {
        self.frames[frame_slot(self.frame_number, self.frames.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_rotate_through_slots() {
        let slots: Vec<usize> = (0..5).map(|n| frame_slot(n, 2)).collect();
        assert_eq!(slots, [0, 1, 0, 1, 0]);
        assert!((0..10).all(|n| frame_slot(n, 1) == 0));
    }

    #[test]
    fn consecutive_frames_never_share_sync_objects() {
        for frames_in_flight in 2..=3 {
            for n in 0..20 {
                assert_ne!(frame_slot(n, frames_in_flight), frame_slot(n + 1, frames_in_flight));
            }
        }
    }
}
