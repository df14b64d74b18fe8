use ash::vk;

use crate::vk_types::vertex::Vertex;

/// Non-indexed vertex list plus the GPU buffer it was uploaded to.
///
/// The buffer memory itself is owned by the engine's main deletion queue, the
/// mesh only keeps the handle for drawing.
#[derive(Default, Debug)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub vertex_buffer: vk::Buffer,
}

impl Mesh {
    pub fn triangle() -> Self {
        const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
        let corner = |position: [f32; 3]| Vertex {
            position,
            color: GREEN,
            ..Default::default()
        };
        Mesh {
            vertices: vec![
                corner([1.0, 1.0, 0.0]),
                corner([-1.0, 1.0, 0.0]),
                corner([0.0, -1.0, 0.0]),
            ],
            vertex_buffer: vk::Buffer::null(),
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn byte_size(&self) -> vk::DeviceSize {
        std::mem::size_of_val(self.vertices.as_slice()) as vk::DeviceSize
    }

    pub fn is_uploaded(&self) -> bool {
        self.vertex_buffer != vk::Buffer::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_is_green_and_not_uploaded() {
        let mesh = Mesh::triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.vertices.iter().all(|v| v.color == [0.0, 1.0, 0.0]));
        assert_eq!(mesh.vertices[2].position, [0.0, -1.0, 0.0]);
        assert!(!mesh.is_uploaded());
        assert_eq!(mesh.byte_size(), 108);
    }
}
