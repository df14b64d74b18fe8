pub mod device;
pub mod swapchain;

use crate::config::{AssetConfig, DebugConfig};
use crate::error::{EngineError, EngineResult};
use crate::vk_debug::{self, vulkan_debug_callback, VALIDATION_LAYER};
use crate::vk_engine::frame_data::FrameData;
use crate::vk_init;
use crate::vk_loader::AssetSource;
use crate::vk_pipelines::{self, PipelineBuilder, ScenePipelines};
use crate::vk_types::push_constants::MeshPushConstants;
use crate::vk_types::vertex::Vertex;
use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::Swapchain;
use ash::vk::Handle;
use ash::{vk, Device, Entry, Instance};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use sdl2::video::Window;
use std::ffi::{c_char, CStr, CString};
use std::mem::size_of;
use std::slice;

pub const APPLICATION_NAME: &CStr = c"Example Vulkan Application";

//-----------------------------INSTANCE-------------------------------
/// Returns the instance and whether the validation layer ended up enabled.
pub fn create_instance(entry: &Entry, window: &Window, debug: &DebugConfig) -> EngineResult<(Instance, bool)> {
    let app_info = vk::ApplicationInfo::builder()
        .application_name(APPLICATION_NAME)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"No Engine")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::make_api_version(0, 1, 1, 0));

    let window_extensions = window
        .vulkan_instance_extensions()
        .map_err(EngineError::Sdl)?
        .into_iter()
        .map(CString::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EngineError::Sdl(e.to_string()))?;
    let mut extension_names: Vec<*const c_char> =
        window_extensions.iter().map(|name| name.as_ptr()).collect();

    let validation = debug.validation_layers && vk_debug::layer_available(entry, VALIDATION_LAYER);
    if debug.validation_layers && !validation {
        log::warn!("validation layers requested, but {:?} is not installed", VALIDATION_LAYER);
    }
    let mut layer_names: Vec<*const c_char> = Vec::new();
    if validation {
        extension_names.push(DebugUtils::name().as_ptr());
        layer_names.push(VALIDATION_LAYER.as_ptr());
    }

    let instance_create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names);

    let instance = unsafe { entry.create_instance(&instance_create_info, None)? };
    Ok((instance, validation))
}

//---------------------------------------DEBUG-----------------------------------------
pub fn create_debug_messenger(debug_utils_loader: &DebugUtils) -> EngineResult<vk::DebugUtilsMessengerEXT> {
    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    Ok(unsafe { debug_utils_loader.create_debug_utils_messenger(&debug_info, None)? })
}

//----------------------------SURFACE------------------------------------
pub fn create_surface(instance: &Instance, window: &Window) -> EngineResult<vk::SurfaceKHR> {
    let instance_handle = instance.handle().as_raw();
    let surface = window
        .vulkan_create_surface(instance_handle as sdl2::sys::VkInstance)
        .map_err(EngineError::Sdl)?;
    Ok(vk::SurfaceKHR::from_raw(surface))
}

//----------------------------DEVICE------------------------------------
pub fn create_device(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
) -> EngineResult<(Device, vk::Queue)> {
    let priorities = [1.0];
    let queue_info = vk::DeviceQueueCreateInfo::builder()
        .queue_family_index(queue_family_index)
        .queue_priorities(&priorities)
        .build();
    let device_extension_names = [Swapchain::name().as_ptr()];

    let device_create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(slice::from_ref(&queue_info))
        .enabled_extension_names(&device_extension_names);
    let device = unsafe { instance.create_device(physical_device, &device_create_info, None)? };
    let graphics_queue = unsafe { device.get_device_queue(queue_family_index, 0) };

    Ok((device, graphics_queue))
}

pub fn create_allocator(
    instance: &Instance,
    device: &Device,
    physical_device: vk::PhysicalDevice,
) -> EngineResult<Allocator> {
    Ok(Allocator::new(&AllocatorCreateDesc {
        instance: instance.clone(),
        device: device.clone(),
        physical_device,
        debug_settings: Default::default(),
        buffer_device_address: false,
        allocation_sizes: Default::default(),
    })?)
}

//----------------------------RENDERPASS------------------------------------
pub fn create_default_renderpass(
    device: &Device,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> EngineResult<vk::RenderPass> {
    let attachments = [
        // cleared on load, kept for presentation afterwards
        vk::AttachmentDescription::builder()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build(),
        vk::AttachmentDescription::builder()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::CLEAR)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build(),
    ];

    let color_attachment_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let depth_attachment_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(slice::from_ref(&color_attachment_ref))
        .depth_stencil_attachment(&depth_attachment_ref)
        .build();

    let dependencies = [
        vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .build(),
        vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            )
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            )
            .dst_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
            .build(),
    ];

    let render_pass_info = vk::RenderPassCreateInfo::builder()
        .attachments(&attachments)
        .subpasses(slice::from_ref(&subpass))
        .dependencies(&dependencies);

    Ok(unsafe { device.create_render_pass(&render_pass_info, None)? })
}

/// One framebuffer per swapchain image, all sharing the depth view.
pub fn create_framebuffers(
    device: &Device,
    render_pass: vk::RenderPass,
    swapchain_image_views: &[vk::ImageView],
    depth_image_view: vk::ImageView,
    extent: vk::Extent2D,
) -> EngineResult<Vec<vk::Framebuffer>> {
    create_all(
        swapchain_image_views.iter(),
        |&view| {
            let attachments = [view, depth_image_view];
            let fb_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            Ok(unsafe { device.create_framebuffer(&fb_info, None)? })
        },
        |framebuffer| unsafe { device.destroy_framebuffer(framebuffer, None) },
    )
}

/// Creates one object per input. If any creation fails, the ones already made are
/// handed to `destroy` before the error is returned.
pub fn create_all<I, T>(
    inputs: I,
    mut create: impl FnMut(I::Item) -> EngineResult<T>,
    mut destroy: impl FnMut(T),
) -> EngineResult<Vec<T>>
where
    I: IntoIterator,
{
    let mut created = Vec::new();
    for input in inputs {
        match create(input) {
            Ok(object) => created.push(object),
            Err(e) => {
                created.into_iter().for_each(&mut destroy);
                return Err(e);
            }
        }
    }
    Ok(created)
}

//----------------------------COMMANDS & SYNC------------------------------------
/// Render-finished semaphores, one per swapchain image.
///
/// Present consumes the semaphore of the image it shows, so it can only be
/// signaled again once that same image has been acquired again.
pub fn create_render_semaphores(device: &Device, image_count: usize) -> EngineResult<Vec<vk::Semaphore>> {
    let semaphore_create_info = vk_init::semaphore_create_info(vk::SemaphoreCreateFlags::empty());
    create_all(
        0..image_count,
        |_| Ok(unsafe { device.create_semaphore(&semaphore_create_info, None)? }),
        |semaphore| unsafe { device.destroy_semaphore(semaphore, None) },
    )
}

/// Command pool, command buffer, fence and acquire semaphore for each frame in flight.
pub fn init_frames(device: &Device, graphics_queue_family: u32, count: usize) -> EngineResult<Vec<FrameData>> {
    let command_pool_info = vk_init::command_pool_create_info(
        graphics_queue_family,
        vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
    );
    // signaled, so the first wait on it returns immediately
    let fence_create_info = vk_init::fence_create_info(vk::FenceCreateFlags::SIGNALED);
    let semaphore_create_info = vk_init::semaphore_create_info(vk::SemaphoreCreateFlags::empty());

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let mut frame = FrameData::default();
        let created = (|| -> EngineResult<()> {
            unsafe {
                frame.command_pool = device.create_command_pool(&command_pool_info, None)?;
                let cmd_alloc_info = vk_init::command_buffer_allocate_info(frame.command_pool, 1);
                frame.main_command_buffer = device.allocate_command_buffers(&cmd_alloc_info)?[0];
                frame.render_fence = device.create_fence(&fence_create_info, None)?;
                frame.present_semaphore = device.create_semaphore(&semaphore_create_info, None)?;
            }
            Ok(())
        })();
        if let Err(e) = created {
            frames.push(frame);
            for frame in &frames {
                unsafe { frame.destroy(device) };
            }
            return Err(e);
        }
        frames.push(frame);
    }
    Ok(frames)
}

//----------------------------PIPELINES------------------------------------
pub fn init_pipelines(
    device: &Device,
    assets: &dyn AssetSource,
    shaders: &AssetConfig,
    render_pass: vk::RenderPass,
) -> EngineResult<ScenePipelines> {
    let mut modules = Vec::new();
    let result = build_scene_pipelines(device, assets, shaders, render_pass, &mut modules);
    //shader modules are not needed once the pipelines exist
    for module in modules {
        unsafe { device.destroy_shader_module(module, None) };
    }
    result
}

fn build_scene_pipelines(
    device: &Device,
    assets: &dyn AssetSource,
    shaders: &AssetConfig,
    render_pass: vk::RenderPass,
    modules: &mut Vec<vk::ShaderModule>,
) -> EngineResult<ScenePipelines> {
    let mut load = |path: &str| -> EngineResult<vk::ShaderModule> {
        let module = vk_pipelines::load_shader_module(device, assets, path)?;
        modules.push(module);
        Ok(module)
    };
    let triangle_vertex_shader = load(&shaders.triangle_vertex_shader)?;
    let mesh_vertex_shader = load(&shaders.mesh_vertex_shader)?;
    let fragment_shader = load(&shaders.fragment_shader)?;

    let mut pipelines = ScenePipelines::default();

    //no descriptor sets or push constants for the hardcoded triangle
    let triangle_layout_info = vk::PipelineLayoutCreateInfo::builder();
    pipelines.triangle_layout = unsafe { device.create_pipeline_layout(&triangle_layout_info, None)? };

    let mut pipeline_builder = PipelineBuilder::default();
    pipeline_builder.pipeline_layout = pipelines.triangle_layout;
    pipeline_builder.set_shaders(triangle_vertex_shader, fragment_shader);
    //positions come from gl_VertexIndex
    pipeline_builder.clear_vertex_input();
    pipeline_builder.set_input_topology(vk::PrimitiveTopology::TRIANGLE_LIST);
    pipeline_builder.set_polygon_mode(vk::PolygonMode::FILL);
    pipeline_builder.set_cull_mode(vk::CullModeFlags::NONE, vk::FrontFace::CLOCKWISE);
    pipeline_builder.set_multisampling_none();
    pipeline_builder.disable_blending();
    pipeline_builder.enable_depth_test(true, vk::CompareOp::LESS_OR_EQUAL);

    pipelines.triangle_pipeline = match pipeline_builder.build_pipeline(device, render_pass) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            unsafe { pipelines.destroy(device) };
            return Err(e);
        }
    };

    //mesh pipeline reads vertices from a buffer and takes its matrix as a push constant
    let push_constant = vk::PushConstantRange::builder()
        .offset(0)
        .size(size_of::<MeshPushConstants>() as u32)
        .stage_flags(vk::ShaderStageFlags::VERTEX)
        .build();
    let mesh_layout_info = vk::PipelineLayoutCreateInfo::builder()
        .push_constant_ranges(slice::from_ref(&push_constant));
    pipelines.mesh_layout = match unsafe { device.create_pipeline_layout(&mesh_layout_info, None) } {
        Ok(layout) => layout,
        Err(e) => {
            unsafe { pipelines.destroy(device) };
            return Err(e.into());
        }
    };

    pipeline_builder.pipeline_layout = pipelines.mesh_layout;
    pipeline_builder.set_vertex_input(&Vertex::get_vertex_description());
    pipeline_builder.set_shaders(mesh_vertex_shader, fragment_shader);
    pipelines.mesh_pipeline = match pipeline_builder.build_pipeline(device, render_pass) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            unsafe { pipelines.destroy(device) };
            return Err(e);
        }
    };

    Ok(pipelines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_all_keeps_input_order() {
        let created = create_all(1..=3, |n| Ok(n * 10), |_: i32| panic!("nothing to roll back"));
        assert_eq!(created.unwrap(), [10, 20, 30]);
    }

    #[test]
    fn failed_creation_destroys_what_was_made() {
        let mut destroyed = Vec::new();
        let mut attempts = 0;
        let result = create_all(
            ["view0", "view1", "view2", "view3"],
            |name| {
                attempts += 1;
                match name {
                    "view2" => Err(EngineError::Vk(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)),
                    _ => Ok(name),
                }
            },
            |name| destroyed.push(name),
        );
        assert!(matches!(result, Err(EngineError::Vk(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))));
        assert_eq!(attempts, 3);
        assert_eq!(destroyed, ["view0", "view1"]);
    }
}
