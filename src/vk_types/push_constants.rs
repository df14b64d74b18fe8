use cgmath::Matrix4;

// push constants for our mesh object draws
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshPushConstants {
    pub data: [f32; 4],
    pub render_matrix: [[f32; 4]; 4],
}

impl MeshPushConstants {
    pub fn new(render_matrix: Matrix4<f32>) -> Self {
        Self {
            data: [0.0; 4],
            render_matrix: render_matrix.into(),
        }
    }
}
