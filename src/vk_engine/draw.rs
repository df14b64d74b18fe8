use ash::prelude::VkResult;
use ash::vk;

use crate::error::EngineResult;
use crate::vk_engine::frame_data::FrameData;
use crate::vk_engine::scene::{self, Scene};
use crate::vk_engine::VulkanEngine;
use crate::vk_init;
use crate::vk_types::mesh::Mesh;
use crate::vk_types::push_constants::MeshPushConstants;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    Image { index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface, nothing was acquired.
    OutOfDate,
    /// Timed out without an image; try again next frame.
    NotReady,
}

pub fn classify_acquire(result: VkResult<(u32, bool)>) -> Result<Acquired, vk::Result> {
    match result {
        Ok((index, suboptimal)) => Ok(Acquired::Image { index, suboptimal }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquired::OutOfDate),
        Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => Ok(Acquired::NotReady),
        Err(e) => Err(e),
    }
}

/// Returns whether the swapchain needs to be recreated after presenting.
pub fn classify_present(result: VkResult<bool>) -> Result<bool, vk::Result> {
    match result {
        Ok(suboptimal) => Ok(suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
        Err(e) => Err(e),
    }
}

/// The GPU side of one frame, in the order `run_frame` calls it.
pub trait FrameSteps {
    /// Rebuilds a stale swapchain. Returns false when there is nothing to draw into.
    fn prepare_swapchain(&mut self) -> EngineResult<bool>;
    fn wait_for_fence(&mut self) -> VkResult<()>;
    fn acquire_image(&mut self) -> VkResult<(u32, bool)>;
    fn reset_fence(&mut self) -> VkResult<()>;
    fn record_and_submit(&mut self, image_index: u32) -> EngineResult<()>;
    fn present(&mut self, image_index: u32) -> VkResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing was submitted; the same frame is tried again.
    Skipped,
    /// Acquire found the swapchain out of date; the fence is still signaled.
    OutOfDate,
    Presented { stale: bool },
}

impl FrameOutcome {
    pub fn advances_frame(self) -> bool {
        matches!(self, FrameOutcome::Presented { .. })
    }

    pub fn marks_stale(self) -> bool {
        matches!(self, FrameOutcome::OutOfDate | FrameOutcome::Presented { stale: true })
    }
}

pub fn run_frame<S: FrameSteps>(steps: &mut S) -> EngineResult<FrameOutcome> {
    if !steps.prepare_swapchain()? {
        return Ok(FrameOutcome::Skipped);
    }

    //wait until the gpu has finished rendering the last frame that used these sync objects
    match steps.wait_for_fence() {
        Ok(()) => {}
        Err(vk::Result::TIMEOUT) => {
            log::warn!("Timed out waiting for the frame fence");
            return Ok(FrameOutcome::Skipped);
        }
        Err(e) => return Err(e.into()),
    }

    let (image_index, suboptimal) = match classify_acquire(steps.acquire_image())? {
        Acquired::Image { index, suboptimal } => (index, suboptimal),
        //the fence stays signaled so the next wait on it does not hang
        Acquired::OutOfDate => return Ok(FrameOutcome::OutOfDate),
        Acquired::NotReady => {
            log::warn!("No swapchain image available");
            return Ok(FrameOutcome::Skipped);
        }
    };

    steps.reset_fence()?;
    steps.record_and_submit(image_index)?;
    let present_stale = classify_present(steps.present(image_index))?;

    Ok(FrameOutcome::Presented {
        stale: suboptimal || present_stale,
    })
}

struct EngineFrame<'a> {
    engine: &'a mut VulkanEngine,
    frame: FrameData,
}

impl FrameSteps for EngineFrame<'_> {
    fn prepare_swapchain(&mut self) -> EngineResult<bool> {
        if !self.engine.swapchain_stale {
            return Ok(true);
        }
        self.engine.recreate_swapchain()
    }

    fn wait_for_fence(&mut self) -> VkResult<()> {
        unsafe {
            self.engine
                .gpu
                .device
                .wait_for_fences(&[self.frame.render_fence], true, self.engine.timeout_ns)
        }
    }

    fn acquire_image(&mut self) -> VkResult<(u32, bool)> {
        //request image from the swapchain
        unsafe {
            self.engine.gpu.swapchain_loader.acquire_next_image(
                self.engine.swapchain,
                self.engine.timeout_ns,
                self.frame.present_semaphore,
                vk::Fence::null(),
            )
        }
    }

    fn reset_fence(&mut self) -> VkResult<()> {
        unsafe { self.engine.gpu.device.reset_fences(&[self.frame.render_fence]) }
    }

    fn record_and_submit(&mut self, image_index: u32) -> EngineResult<()> {
        let cmd = self.frame.main_command_buffer;
        self.engine.record_commands(cmd, image_index)?;

        //wait on the present semaphore, as it is signaled when the swapchain is ready
        //signal the image's render semaphore, to tell the presentation that rendering is done
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let wait_semaphores = [self.frame.present_semaphore];
        let signal_semaphores = [self.engine.render_semaphores[image_index as usize]];
        let command_buffers = [cmd];
        let submit = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();
        unsafe {
            self.engine
                .gpu
                .device
                .queue_submit(self.engine.graphics_queue, &[submit], self.frame.render_fence)?
        };
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> VkResult<bool> {
        let swapchains = [self.engine.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [self.engine.render_semaphores[image_index as usize]];
        let present_info = vk::PresentInfoKHR::builder()
            .swapchains(&swapchains)
            .wait_semaphores(&wait_semaphores)
            .image_indices(&image_indices);
        unsafe {
            self.engine
                .gpu
                .swapchain_loader
                .queue_present(self.engine.graphics_queue, &present_info)
        }
    }
}

impl VulkanEngine {
    pub fn draw(&mut self) -> EngineResult<()> {
        let frame = self.get_current_frame();
        let outcome = run_frame(&mut EngineFrame { engine: self, frame })?;

        if outcome.marks_stale() {
            self.swapchain_stale = true;
        }
        if outcome.advances_frame() {
            self.frame_number += 1;
        }
        Ok(())
    }

    fn record_commands(&self, cmd: vk::CommandBuffer, swapchain_image_index: u32) -> EngineResult<()> {
        let device = &self.gpu.device;
        unsafe {
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            let cmd_begin_info = vk_init::command_buffer_begin_info(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cmd, &cmd_begin_info)?;

            let clear_values = scene::clear_values(self.frame_number, self.flash_period);
            let rp_info = vk::RenderPassBeginInfo::builder()
                .render_pass(self.render_pass)
                .framebuffer(self.framebuffers[swapchain_image_index as usize])
                .render_area(vk_init::scissor(self.swapchain_extent))
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(cmd, &rp_info, vk::SubpassContents::INLINE);

            device.cmd_set_viewport(cmd, 0, &[vk_init::viewport(self.swapchain_extent)]);
            device.cmd_set_scissor(cmd, 0, &[vk_init::scissor(self.swapchain_extent)]);

            match self.scene {
                Scene::Mesh => self.draw_mesh(cmd, &self.monkey_mesh),
                Scene::TriangleMesh => self.draw_mesh(cmd, &self.triangle_mesh),
                Scene::Triangle => {
                    device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipelines.triangle_pipeline);
                    device.cmd_draw(cmd, 3, 1, 0, 0);
                }
            }

            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd)?;
        }
        Ok(())
    }

    unsafe fn draw_mesh(&self, cmd: vk::CommandBuffer, mesh: &Mesh) {
        if !mesh.is_uploaded() {
            return;
        }
        let device = &self.gpu.device;
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipelines.mesh_pipeline);
        device.cmd_bind_vertex_buffers(cmd, 0, &[mesh.vertex_buffer], &[0]);

        let constants = MeshPushConstants::new(scene::mesh_matrix(self.frame_number, self.swapchain_extent));
        device.cmd_push_constants(
            cmd,
            self.pipelines.mesh_layout,
            vk::ShaderStageFlags::VERTEX,
            0,
            bytemuck::bytes_of(&constants),
        );
        device.cmd_draw(cmd, mesh.vertex_count(), 1, 0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Prepare,
        Wait,
        Acquire,
        Reset,
        Submit(u32),
        Present(u32),
    }

    /// Scripted frame that records which steps ran.
    struct ScriptedFrame {
        drawable: bool,
        fence: VkResult<()>,
        acquire: VkResult<(u32, bool)>,
        present: VkResult<bool>,
        calls: Vec<Call>,
    }

    impl ScriptedFrame {
        fn new() -> Self {
            Self {
                drawable: true,
                fence: Ok(()),
                acquire: Ok((1, false)),
                present: Ok(false),
                calls: Vec::new(),
            }
        }
    }

    impl FrameSteps for ScriptedFrame {
        fn prepare_swapchain(&mut self) -> EngineResult<bool> {
            self.calls.push(Call::Prepare);
            Ok(self.drawable)
        }
        fn wait_for_fence(&mut self) -> VkResult<()> {
            self.calls.push(Call::Wait);
            self.fence
        }
        fn acquire_image(&mut self) -> VkResult<(u32, bool)> {
            self.calls.push(Call::Acquire);
            self.acquire
        }
        fn reset_fence(&mut self) -> VkResult<()> {
            self.calls.push(Call::Reset);
            Ok(())
        }
        fn record_and_submit(&mut self, image_index: u32) -> EngineResult<()> {
            self.calls.push(Call::Submit(image_index));
            Ok(())
        }
        fn present(&mut self, image_index: u32) -> VkResult<bool> {
            self.calls.push(Call::Present(image_index));
            self.present
        }
    }

    #[test]
    fn acquire_results_are_classified() {
        assert_eq!(
            classify_acquire(Ok((2, false))),
            Ok(Acquired::Image { index: 2, suboptimal: false })
        );
        assert_eq!(
            classify_acquire(Ok((0, true))),
            Ok(Acquired::Image { index: 0, suboptimal: true })
        );
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)),
            Ok(Acquired::OutOfDate)
        );
        assert_eq!(classify_acquire(Err(vk::Result::TIMEOUT)), Ok(Acquired::NotReady));
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)),
            Err(vk::Result::ERROR_DEVICE_LOST)
        );
    }

    #[test]
    fn present_results_mark_swapchain_stale() {
        assert_eq!(classify_present(Ok(false)), Ok(false));
        assert_eq!(classify_present(Ok(true)), Ok(true));
        assert_eq!(classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)), Ok(true));
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)),
            Err(vk::Result::ERROR_SURFACE_LOST_KHR)
        );
    }

    #[test]
    fn normal_frame_runs_every_step_in_order() {
        let mut frame = ScriptedFrame::new();
        let outcome = run_frame(&mut frame).unwrap();
        assert_eq!(outcome, FrameOutcome::Presented { stale: false });
        assert_eq!(
            frame.calls,
            [Call::Prepare, Call::Wait, Call::Acquire, Call::Reset, Call::Submit(1), Call::Present(1)]
        );
        assert!(outcome.advances_frame());
        assert!(!outcome.marks_stale());
    }

    #[test]
    fn out_of_date_acquire_keeps_fence_signaled() {
        let mut frame = ScriptedFrame::new();
        frame.acquire = Err(vk::Result::ERROR_OUT_OF_DATE_KHR);
        let outcome = run_frame(&mut frame).unwrap();
        assert_eq!(outcome, FrameOutcome::OutOfDate);
        assert_eq!(frame.calls, [Call::Prepare, Call::Wait, Call::Acquire]);
        assert!(outcome.marks_stale());
        assert!(!outcome.advances_frame());
    }

    #[test]
    fn suboptimal_acquire_still_presents_then_goes_stale() {
        let mut frame = ScriptedFrame::new();
        frame.acquire = Ok((2, true));
        let outcome = run_frame(&mut frame).unwrap();
        assert_eq!(outcome, FrameOutcome::Presented { stale: true });
        assert_eq!(frame.calls[3..], [Call::Reset, Call::Submit(2), Call::Present(2)]);
        assert!(outcome.marks_stale() && outcome.advances_frame());
    }

    #[test]
    fn fence_timeout_skips_without_advancing() {
        let mut frame = ScriptedFrame::new();
        frame.fence = Err(vk::Result::TIMEOUT);
        let outcome = run_frame(&mut frame).unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(frame.calls, [Call::Prepare, Call::Wait]);
        assert!(!outcome.advances_frame() && !outcome.marks_stale());
    }

    #[test]
    fn zero_area_swapchain_skips_before_fence_wait() {
        let mut frame = ScriptedFrame::new();
        frame.drawable = false;
        let outcome = run_frame(&mut frame).unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(frame.calls, [Call::Prepare]);
        assert!(!outcome.advances_frame());
    }

    #[test]
    fn out_of_date_present_marks_stale_after_submit() {
        let mut frame = ScriptedFrame::new();
        frame.present = Err(vk::Result::ERROR_OUT_OF_DATE_KHR);
        let outcome = run_frame(&mut frame).unwrap();
        assert_eq!(outcome, FrameOutcome::Presented { stale: true });
        assert_eq!(frame.calls.last(), Some(&Call::Present(1)));
    }

    #[test]
    fn device_errors_abort_the_frame() {
        let mut frame = ScriptedFrame::new();
        frame.fence = Err(vk::Result::ERROR_DEVICE_LOST);
        assert!(run_frame(&mut frame).is_err());
        assert_eq!(frame.calls, [Call::Prepare, Call::Wait]);

        let mut frame = ScriptedFrame::new();
        frame.present = Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        assert!(run_frame(&mut frame).is_err());
    }
}
