mod deletion_queue;
mod draw;
pub mod frame_data;
pub mod scene;

use crate::config::Config;
use crate::error::EngineResult;
use crate::vk_bootstrap::device::pick_physical_device_and_queue;
use crate::vk_bootstrap::swapchain::{create_swapchain, surface_extent, SwapchainRequest};
use crate::vk_bootstrap;
use crate::vk_debug;
use crate::vk_images;
use crate::vk_loader::{self, AssetDir};
use crate::vk_pipelines::ScenePipelines;
use crate::vk_types::buffers::create_buffer;
use crate::vk_types::mesh::Mesh;
use crate::vk_types::GpuContext;
use anyhow::{Context, Result};
use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain};
use ash::{vk, Entry, Instance};
use deletion_queue::DeletionQueue;
use frame_data::FrameData;
use gpu_allocator::MemoryLocation;
use scene::Scene;
use sdl2::video::Window;
use std::mem::ManuallyDrop;

pub struct VulkanEngine {
    pub is_initialized: bool,
    pub frame_number: u64,
    pub window_extent: vk::Extent2D,
    pub instance: Instance,
    pub debug_messenger: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    pub surface_loader: Surface,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub gpu: GpuContext,
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    //swapchain stuff
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_format: vk::SurfaceFormatKHR,
    pub swapchain_extent: vk::Extent2D,
    pub swapchain_images: Vec<vk::Image>,
    pub swapchain_image_views: Vec<vk::ImageView>,
    pub depth_image_view: vk::ImageView,
    /// One per swapchain image, signaled when rendering into that image is done.
    pub render_semaphores: Vec<vk::Semaphore>,
    /// Set when the surface changed under us; the next draw rebuilds the swapchain.
    pub swapchain_stale: bool,
    pub present_mode: vk::PresentModeKHR,
    pub render_pass: vk::RenderPass,
    pub framebuffers: Vec<vk::Framebuffer>,
    pub frames: Vec<FrameData>,
    pub pipelines: ScenePipelines,
    pub triangle_mesh: Mesh,
    pub monkey_mesh: Mesh,
    pub scene: Scene,
    pub timeout_ns: u64,
    pub flash_period: f32,
    main_deletion_queue: DeletionQueue<GpuContext>,
    swapchain_deletion_queue: DeletionQueue<GpuContext>,
}

// Initialization
impl VulkanEngine {
    pub fn init(window: &Window, config: &Config) -> Result<Self> {
        let (width, height) = window.vulkan_drawable_size();
        let window_extent = vk::Extent2D { width, height };

        //Vulkan initialization
        let entry = Entry::linked();
        if config.debug.log_layers {
            vk_debug::log_layers_and_extensions(&entry);
        }
        let (instance, validation) = vk_bootstrap::create_instance(&entry, window, &config.debug)
            .context("Failed to create Vulkan instance")?;

        //Debug Utils initialization
        let debug_messenger = if validation {
            let debug_utils_loader = DebugUtils::new(&entry, &instance);
            match vk_bootstrap::create_debug_messenger(&debug_utils_loader) {
                Ok(messenger) => Some((debug_utils_loader, messenger)),
                Err(e) => {
                    log::warn!("Failed to create debug messenger: {e}");
                    None
                }
            }
        } else {
            None
        };

        let surface_loader = Surface::new(&entry, &instance);
        let device_objects = vk_bootstrap::create_surface(&instance, window).and_then(|surface| {
            let picked = pick_physical_device_and_queue(&instance, &surface_loader, surface)
                .and_then(|(physical_device, family)| {
                    let (device, queue) = vk_bootstrap::create_device(&instance, physical_device, family)?;
                    Ok((physical_device, family, device, queue))
                });
            match picked {
                Ok(picked) => Ok((surface, picked)),
                Err(e) => {
                    unsafe { surface_loader.destroy_surface(surface, None) };
                    Err(e)
                }
            }
        });
        let (surface, (physical_device, graphics_queue_family, device, graphics_queue)) = match device_objects {
            Ok(objects) => objects,
            Err(e) => {
                unsafe { destroy_instance(&instance, &debug_messenger) };
                return Err(e).context("Failed to set up a Vulkan device");
            }
        };

        let allocator = match vk_bootstrap::create_allocator(&instance, &device, physical_device) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe {
                    device.destroy_device(None);
                    surface_loader.destroy_surface(surface, None);
                    destroy_instance(&instance, &debug_messenger);
                }
                return Err(e).context("Failed to create GPU allocator");
            }
        };
        let swapchain_loader = Swapchain::new(&instance, &device);

        //from here on Drop cleans up whatever was registered on the deletion queues
        let mut engine = VulkanEngine {
            is_initialized: true,
            frame_number: 0,
            window_extent,
            instance,
            debug_messenger,
            surface_loader,
            surface,
            physical_device,
            gpu: GpuContext {
                device,
                swapchain_loader,
                allocator: ManuallyDrop::new(allocator),
            },
            graphics_queue,
            graphics_queue_family,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_format: vk::SurfaceFormatKHR::default(),
            swapchain_extent: vk::Extent2D::default(),
            swapchain_images: Vec::new(),
            swapchain_image_views: Vec::new(),
            depth_image_view: vk::ImageView::null(),
            render_semaphores: Vec::new(),
            swapchain_stale: false,
            present_mode: config.present_mode(),
            render_pass: vk::RenderPass::null(),
            framebuffers: Vec::new(),
            frames: Vec::new(),
            pipelines: ScenePipelines::default(),
            triangle_mesh: Mesh::default(),
            monkey_mesh: Mesh::default(),
            scene: Scene::default(),
            timeout_ns: config.graphics.timeout_ns,
            flash_period: config.graphics.flash_period,
            main_deletion_queue: DeletionQueue::default(),
            swapchain_deletion_queue: DeletionQueue::default(),
        };

        let assets = AssetDir::new(&config.assets.root);
        engine.load_meshes(&assets, &config.assets.mesh).context("Failed to load meshes")?;
        engine.init_swapchain().context("Failed to create swapchain")?;
        engine.init_frames(config.frames_in_flight()).context("Failed to create frame data")?;
        engine.init_default_renderpass().context("Failed to create renderpass")?;
        engine.init_framebuffers().context("Failed to create framebuffers")?;
        engine.init_pipelines(&assets, config).context("Failed to create pipelines")?;

        log::info!(
            "Vulkan engine initialized: {}x{}, {} frames in flight",
            engine.swapchain_extent.width,
            engine.swapchain_extent.height,
            engine.frames.len()
        );
        Ok(engine)
    }

    fn load_meshes(&mut self, assets: &AssetDir, mesh_path: &str) -> EngineResult<()> {
        let mut triangle_mesh = Mesh::triangle();
        //a missing model leaves the mesh scene empty, the triangle scenes still work
        let mut monkey_mesh = vk_loader::load_mesh(assets, mesh_path).unwrap_or_else(|e| {
            log::error!("Failed to load {}: {}", mesh_path, e);
            Mesh::default()
        });

        self.upload_mesh(&mut triangle_mesh)?;
        self.upload_mesh(&mut monkey_mesh)?;

        self.triangle_mesh = triangle_mesh;
        self.monkey_mesh = monkey_mesh;
        Ok(())
    }

    /// Copies the vertices into a host-visible vertex buffer owned by the main deletion queue.
    pub fn upload_mesh(&mut self, mesh: &mut Mesh) -> EngineResult<()> {
        if mesh.vertices.is_empty() {
            log::warn!("Skipping upload of a mesh without vertices");
            return Ok(());
        }
        let mut buffer = create_buffer(
            &self.gpu.device,
            &mut self.gpu.allocator,
            "vertex_buffer",
            mesh.byte_size(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            MemoryLocation::CpuToGpu,
        )?;
        if let Err(e) = buffer.write_bytes(bytemuck::cast_slice(&mesh.vertices)) {
            self.gpu.destroy_buffer(buffer);
            return Err(e);
        }

        mesh.vertex_buffer = buffer.buffer;
        self.main_deletion_queue
            .push_function(move |gpu: &mut GpuContext| gpu.destroy_buffer(buffer));
        Ok(())
    }

    /// Swapchain, its image views, render semaphores and the depth image, all sized to the window.
    fn init_swapchain(&mut self) -> EngineResult<()> {
        let request = SwapchainRequest {
            extent: self.window_extent,
            present_mode: self.present_mode,
            composite_alpha: vk::CompositeAlphaFlagsKHR::INHERIT,
            //once the renderpass exists its color format is fixed
            format: (self.render_pass != vk::RenderPass::null()).then_some(self.swapchain_format),
            old_swapchain: vk::SwapchainKHR::null(),
        };
        let bundle = create_swapchain(
            &self.gpu.device,
            self.physical_device,
            &self.surface_loader,
            &self.gpu.swapchain_loader,
            self.surface,
            &request,
        )?;

        let swapchain = bundle.swapchain;
        self.swapchain_deletion_queue
            .push_function(move |gpu: &mut GpuContext| unsafe {
                gpu.swapchain_loader.destroy_swapchain(swapchain, None)
            });
        let views = bundle.image_views.clone();
        self.swapchain_deletion_queue
            .push_function(move |gpu: &mut GpuContext| {
                for view in views {
                    unsafe { gpu.device.destroy_image_view(view, None) };
                }
            });

        self.swapchain = bundle.swapchain;
        self.swapchain_format = bundle.format;
        self.swapchain_extent = bundle.extent;
        self.swapchain_images = bundle.images;
        self.swapchain_image_views = bundle.image_views;

        let render_semaphores = vk_bootstrap::create_render_semaphores(&self.gpu.device, self.swapchain_images.len())?;
        self.render_semaphores = render_semaphores.clone();
        self.swapchain_deletion_queue
            .push_function(move |gpu: &mut GpuContext| {
                for semaphore in render_semaphores {
                    unsafe { gpu.device.destroy_semaphore(semaphore, None) };
                }
            });

        let depth_image = vk_images::create_depth_image(&self.gpu.device, &mut self.gpu.allocator, self.swapchain_extent)?;
        self.depth_image_view = depth_image.image_view;
        self.swapchain_deletion_queue
            .push_function(move |gpu: &mut GpuContext| gpu.destroy_image(depth_image));
        Ok(())
    }

    fn init_frames(&mut self, frames_in_flight: usize) -> EngineResult<()> {
        let frames = vk_bootstrap::init_frames(&self.gpu.device, self.graphics_queue_family, frames_in_flight)?;
        self.frames = frames.clone();
        self.main_deletion_queue
            .push_function(move |gpu: &mut GpuContext| {
                for frame in frames.iter() {
                    unsafe { frame.destroy(&gpu.device) };
                }
            });
        Ok(())
    }

    fn init_default_renderpass(&mut self) -> EngineResult<()> {
        let render_pass = vk_bootstrap::create_default_renderpass(
            &self.gpu.device,
            self.swapchain_format.format,
            vk_images::DEPTH_FORMAT,
        )?;
        self.render_pass = render_pass;
        self.main_deletion_queue
            .push_function(move |gpu: &mut GpuContext| unsafe {
                gpu.device.destroy_render_pass(render_pass, None)
            });
        Ok(())
    }

    fn init_framebuffers(&mut self) -> EngineResult<()> {
        let framebuffers = vk_bootstrap::create_framebuffers(
            &self.gpu.device,
            self.render_pass,
            &self.swapchain_image_views,
            self.depth_image_view,
            self.swapchain_extent,
        )?;
        self.framebuffers = framebuffers.clone();
        self.swapchain_deletion_queue
            .push_function(move |gpu: &mut GpuContext| {
                for framebuffer in framebuffers {
                    unsafe { gpu.device.destroy_framebuffer(framebuffer, None) };
                }
            });
        Ok(())
    }

    fn init_pipelines(&mut self, assets: &AssetDir, config: &Config) -> EngineResult<()> {
        let pipelines = vk_bootstrap::init_pipelines(&self.gpu.device, assets, &config.assets, self.render_pass)?;
        self.pipelines = pipelines;
        self.main_deletion_queue
            .push_function(move |gpu: &mut GpuContext| unsafe { pipelines.destroy(&gpu.device) });
        Ok(())
    }
}

// Runtime state changes
impl VulkanEngine {
    /// Records the new drawable size; the swapchain is rebuilt before the next frame.
    pub fn resize(&mut self, extent: vk::Extent2D) {
        if extent != self.window_extent {
            log::debug!("Window resized to {}x{}", extent.width, extent.height);
        }
        self.window_extent = extent;
        self.swapchain_stale = true;
    }

    pub fn toggle_scene(&mut self) {
        self.scene = self.scene.toggled();
        log::info!("Showing {:?}", self.scene);
    }

    /// Rebuilds everything sized to the window. The renderpass and pipelines are
    /// kept, so the surface format must not change.
    ///
    /// Returns false, touching nothing, while the window or surface has zero area.
    /// The swapchain stays stale until a later call can rebuild it.
    pub fn recreate_swapchain(&mut self) -> EngineResult<bool> {
        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            return Ok(false);
        }
        if surface_extent(self.physical_device, &self.surface_loader, self.surface, self.window_extent)?.is_none() {
            log::debug!("Surface has zero area, waiting before recreating the swapchain");
            return Ok(false);
        }

        unsafe { self.gpu.device.device_wait_idle()? };
        log::debug!(
            "Recreating swapchain at {}x{}, releasing {} objects",
            self.window_extent.width,
            self.window_extent.height,
            self.swapchain_deletion_queue.len()
        );
        self.swapchain_deletion_queue.flush(&mut self.gpu);
        self.swapchain = vk::SwapchainKHR::null();
        self.swapchain_image_views.clear();
        self.framebuffers.clear();
        self.render_semaphores.clear();

        self.init_swapchain()?;
        self.init_framebuffers()?;
        self.swapchain_stale = false;
        Ok(true)
    }
}

unsafe fn destroy_instance(instance: &Instance, debug_messenger: &Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>) {
    if let Some((debug_utils_loader, messenger)) = debug_messenger {
        debug_utils_loader.destroy_debug_utils_messenger(*messenger, None);
    }
    instance.destroy_instance(None);
}

impl Drop for VulkanEngine {
    fn drop(&mut self) {
        if !self.is_initialized {
            return;
        }
        unsafe {
            //make sure the gpu has stopped doing its things
            if let Err(e) = self.gpu.device.device_wait_idle() {
                log::error!("device_wait_idle failed during teardown: {e}");
            }
        }
        self.swapchain_deletion_queue.flush(&mut self.gpu);
        self.main_deletion_queue.flush(&mut self.gpu);
        unsafe {
            //the allocator frees its memory blocks, so it has to go before the device
            ManuallyDrop::drop(&mut self.gpu.allocator);
            self.gpu.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            destroy_instance(&self.instance, &self.debug_messenger);
        }
        self.is_initialized = false;
        log::info!("Vulkan engine destroyed");
    }
}
