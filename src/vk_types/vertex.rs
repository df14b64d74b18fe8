use ash::vk;
use std::mem::{offset_of, size_of};

#[derive(Default, Debug)]
pub struct VertexInputDescription {
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
    pub flags: vk::PipelineVertexInputStateCreateFlags,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    /// One per-vertex binding; position, normal and color at locations 0, 1 and 2.
    pub fn get_vertex_description() -> VertexInputDescription {
        let main_binding = vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(size_of::<Vertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build();

        let attribute = |location: u32, offset: usize| {
            vk::VertexInputAttributeDescription::builder()
                .binding(0)
                .location(location)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(offset as u32)
                .build()
        };

        VertexInputDescription {
            bindings: vec![main_binding],
            attributes: vec![
                attribute(0, offset_of!(Vertex, position)),
                attribute(1, offset_of!(Vertex, normal)),
                attribute(2, offset_of!(Vertex, color)),
            ],
            flags: vk::PipelineVertexInputStateCreateFlags::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(size_of::<Vertex>(), 36);
        let description = Vertex::get_vertex_description();
        assert_eq!(description.bindings.len(), 1);
        assert_eq!(description.bindings[0].stride, 36);
        assert_eq!(description.bindings[0].input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn attributes_follow_field_order() {
        let description = Vertex::get_vertex_description();
        let layout: Vec<(u32, u32)> = description
            .attributes
            .iter()
            .map(|a| (a.location, a.offset))
            .collect();
        assert_eq!(layout, [(0, 0), (1, 12), (2, 24)]);
        assert!(description
            .attributes
            .iter()
            .all(|a| a.format == vk::Format::R32G32B32_SFLOAT && a.binding == 0));
    }

    #[test]
    fn vertices_cast_to_bytes() {
        let vertices = [Vertex::default(); 3];
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&vertices).len(), 108);
    }
}
