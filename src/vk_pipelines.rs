use core::slice;
use std::ffi::CStr;
use std::ptr::null;
use ash::{Device, vk};

use crate::error::{EngineError, EngineResult};
use crate::vk_init;
use crate::vk_loader::{read_spirv, AssetSource};
use crate::vk_types::vertex::VertexInputDescription;

pub const SHADER_ENTRY: &CStr = c"main";

pub fn load_shader_module(device: &Device, assets: &dyn AssetSource, path: &str) -> EngineResult<vk::ShaderModule> {
    let bytes = assets.read_bytes(path)?;
    let byte_code_aligned = read_spirv(path, &bytes)?;
    let shader_create_info = vk::ShaderModuleCreateInfo::builder()
        .code(&byte_code_aligned);

    let module = unsafe {device.create_shader_module(&shader_create_info, None)?};
    log::info!("{} shader successfully loaded", path);
    Ok(module)
}

/// Layouts and pipelines used by the scene; destroyed together.
#[derive(Default, Debug, Clone, Copy)]
pub struct ScenePipelines {
    pub triangle_layout: vk::PipelineLayout,
    pub triangle_pipeline: vk::Pipeline,
    pub mesh_layout: vk::PipelineLayout,
    pub mesh_pipeline: vk::Pipeline,
}

impl ScenePipelines {
    /// Null handles are skipped by the driver, so a partially built set is fine.
    pub unsafe fn destroy(&self, device: &Device) {
        device.destroy_pipeline(self.triangle_pipeline, None);
        device.destroy_pipeline(self.mesh_pipeline, None);
        device.destroy_pipeline_layout(self.triangle_layout, None);
        device.destroy_pipeline_layout(self.mesh_layout, None);
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    pub shader_stages: Vec<vk::PipelineShaderStageCreateInfo>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub vertex_input_flags: vk::PipelineVertexInputStateCreateFlags,
    pub input_assembly: vk::PipelineInputAssemblyStateCreateInfo,
    pub rasterizer: vk::PipelineRasterizationStateCreateInfo,
    pub color_blend_attachment: vk::PipelineColorBlendAttachmentState,
    pub multisampling: vk::PipelineMultisampleStateCreateInfo,
    pub pipeline_layout: vk::PipelineLayout,
    pub depth_stencil: vk::PipelineDepthStencilStateCreateInfo,
}


impl PipelineBuilder {
    pub fn build_pipeline(&self, device: &Device, render_pass: vk::RenderPass) -> EngineResult<vk::Pipeline> {
        //viewport and scissor are dynamic, only the counts are baked in
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        // "no blend", but we do write to the color attachment
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(slice::from_ref(&self.color_blend_attachment));

        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .flags(self.vertex_input_flags)
            .vertex_binding_descriptions(&self.vertex_bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let state = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_info = vk::PipelineDynamicStateCreateInfo::builder()
            .dynamic_states(&state);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&self.shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&self.input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&self.rasterizer)
            .multisample_state(&self.multisampling)
            .color_blend_state(&color_blending)
            .depth_stencil_state(&self.depth_stencil)
            .dynamic_state(&dynamic_info)
            .layout(self.pipeline_layout)
            .render_pass(render_pass)
            .subpass(0)
            .build();

        // it's easy to error out on create graphics pipeline, so log which one failed
        match unsafe {device.create_graphics_pipelines(vk::PipelineCache::null(), slice::from_ref(&pipeline_info), None)} {
            Ok(pipelines) => Ok(pipelines[0]),
            Err((_, e)) => {
                log::error!("failed to create pipeline: {e}");
                Err(EngineError::Vk(e))
            }
        }
    }

    pub fn set_shaders(&mut self, vertex_shader: vk::ShaderModule, fragment_shader: vk::ShaderModule) {
        self.shader_stages.clear();
        self.shader_stages.push(vk_init::pipeline_shader_stage_create_info(vk::ShaderStageFlags::VERTEX, vertex_shader, SHADER_ENTRY).build());
        self.shader_stages.push(vk_init::pipeline_shader_stage_create_info(vk::ShaderStageFlags::FRAGMENT, fragment_shader, SHADER_ENTRY).build());
    }

    pub fn set_vertex_input(&mut self, description: &VertexInputDescription) {
        self.vertex_bindings = description.bindings.clone();
        self.vertex_attributes = description.attributes.clone();
        self.vertex_input_flags = description.flags;
    }

    pub fn clear_vertex_input(&mut self) {
        self.vertex_bindings.clear();
        self.vertex_attributes.clear();
        self.vertex_input_flags = vk::PipelineVertexInputStateCreateFlags::empty();
    }

    pub fn set_input_topology(&mut self, topology: vk::PrimitiveTopology) {
        self.input_assembly.topology = topology;
        self.input_assembly.primitive_restart_enable = vk::FALSE;
    }

    pub fn set_polygon_mode(&mut self, mode: vk::PolygonMode) {
        self.rasterizer.polygon_mode = mode;
        self.rasterizer.line_width = 1f32;
    }

    pub fn set_cull_mode(&mut self, cull_mode: vk::CullModeFlags, front_face: vk::FrontFace) {
        self.rasterizer.cull_mode = cull_mode;
        self.rasterizer.front_face = front_face;
    }

    pub fn set_multisampling_none(&mut self) {
        self.multisampling.sample_shading_enable = vk::FALSE;
        //defaults to no multisampling
        self.multisampling.rasterization_samples = vk::SampleCountFlags::TYPE_1;
        self.multisampling.min_sample_shading = 1f32;
        self.multisampling.p_sample_mask = null();
        //no alpha to coverage either
        self.multisampling.alpha_to_coverage_enable = vk::FALSE;
        self.multisampling.alpha_to_one_enable = vk::FALSE;
    }

    pub fn disable_blending(&mut self) {
        //default write mask
        self.color_blend_attachment.color_write_mask = vk::ColorComponentFlags::RGBA;
        //no blending
        self.color_blend_attachment.blend_enable = vk::FALSE;
    }

    pub fn enable_depth_test(&mut self, depth_write_enable: bool, op: vk::CompareOp) {
        self.depth_stencil.depth_test_enable = vk::TRUE;
        self.depth_stencil.depth_write_enable = depth_write_enable.into();
        self.depth_stencil.depth_compare_op = op;
        self.depth_stencil.depth_bounds_test_enable = vk::FALSE;
        self.depth_stencil.stencil_test_enable = vk::FALSE;
        self.depth_stencil.front = vk::StencilOpState::default();
        self.depth_stencil.back = vk::StencilOpState::default();
        self.depth_stencil.min_depth_bounds = 0f32;
        self.depth_stencil.max_depth_bounds = 1f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vk_types::vertex::Vertex;

    #[test]
    fn depth_test_settings() {
        let mut builder = PipelineBuilder::default();
        builder.enable_depth_test(true, vk::CompareOp::LESS_OR_EQUAL);
        assert_eq!(builder.depth_stencil.depth_test_enable, vk::TRUE);
        assert_eq!(builder.depth_stencil.depth_write_enable, vk::TRUE);
        assert_eq!(builder.depth_stencil.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);

        builder.enable_depth_test(false, vk::CompareOp::ALWAYS);
        assert_eq!(builder.depth_stencil.depth_write_enable, vk::FALSE);
        assert_eq!(builder.depth_stencil.stencil_test_enable, vk::FALSE);
    }

    #[test]
    fn vertex_input_can_be_swapped_out() {
        let mut builder = PipelineBuilder::default();
        builder.set_vertex_input(&Vertex::get_vertex_description());
        assert_eq!(builder.vertex_attributes.len(), 3);
        builder.clear_vertex_input();
        assert!(builder.vertex_bindings.is_empty() && builder.vertex_attributes.is_empty());
    }

    #[test]
    fn vertex_input_flags_come_from_description() {
        let mut builder = PipelineBuilder::default();
        let mut description = Vertex::get_vertex_description();
        description.flags = vk::PipelineVertexInputStateCreateFlags::from_raw(1);
        builder.set_vertex_input(&description);
        assert_eq!(builder.vertex_input_flags, description.flags);
        builder.clear_vertex_input();
        assert!(builder.vertex_input_flags.is_empty());
    }

    #[test]
    fn set_shaders_replaces_stages() {
        let mut builder = PipelineBuilder::default();
        builder.set_shaders(vk::ShaderModule::null(), vk::ShaderModule::null());
        builder.set_shaders(vk::ShaderModule::null(), vk::ShaderModule::null());
        let stages: Vec<_> = builder.shader_stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, [vk::ShaderStageFlags::VERTEX, vk::ShaderStageFlags::FRAGMENT]);
    }

    #[test]
    fn opaque_color_writes() {
        let mut builder = PipelineBuilder::default();
        builder.disable_blending();
        builder.set_multisampling_none();
        assert_eq!(builder.color_blend_attachment.color_write_mask, vk::ColorComponentFlags::RGBA);
        assert_eq!(builder.multisampling.rasterization_samples, vk::SampleCountFlags::TYPE_1);
    }
}
