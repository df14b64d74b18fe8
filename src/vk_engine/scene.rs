use ash::vk;
use cgmath::{Deg, Matrix4, Vector3};

/// Degrees the mesh turns every frame.
pub const ROTATION_PER_FRAME: f32 = 0.4;
/// Frames per full turn.
const ROTATION_FRAMES: u64 = 900;
const CAMERA_POSITION: Vector3<f32> = Vector3::new(0.0, 0.0, -2.0);

/// What the frame loop draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scene {
    /// The OBJ mesh through the mesh pipeline.
    #[default]
    Mesh,
    /// The uploaded green triangle through the mesh pipeline.
    TriangleMesh,
    /// Triangle with positions baked into the vertex shader, no vertex buffer.
    Triangle,
}

impl Scene {
    pub fn toggled(self) -> Self {
        match self {
            Scene::Mesh => Scene::TriangleMesh,
            Scene::TriangleMesh => Scene::Triangle,
            Scene::Triangle => Scene::Mesh,
        }
    }
}

/// Blue channel of the clear color, pulsing with the frame number.
pub fn flash(frame_number: u64, period: f32) -> f32 {
    // |sin| repeats every pi radians; wrapping keeps the f32 input small enough to keep changing
    let cycle = (period * std::f32::consts::PI).round().max(1.0) as u64;
    ((frame_number % cycle) as f32 / period).sin().abs()
}

pub fn clear_values(frame_number: u64, period: f32) -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, flash(frame_number, period), 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ]
}

/// projection * view * model for the spinning mesh.
pub fn mesh_matrix(frame_number: u64, extent: vk::Extent2D) -> Matrix4<f32> {
    let view = Matrix4::from_translation(CAMERA_POSITION);

    let aspect = if extent.height == 0 {
        1.0
    } else {
        extent.width as f32 / extent.height as f32
    };
    let mut projection = cgmath::perspective(Deg(70.0), aspect, 0.1, 200.0);
    // Vulkan's clip space Y points down
    projection.y.y *= -1.0;

    let model = Matrix4::from_angle_y(Deg((frame_number % ROTATION_FRAMES) as f32 * ROTATION_PER_FRAME));

    projection * view * model
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1700,
        height: 900,
    };

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn flash_starts_dark_and_peaks() {
        assert_eq!(flash(0, 120.0), 0.0);
        let peak = (120.0 * std::f32::consts::FRAC_PI_2).round() as u64;
        assert!(flash(peak, 120.0) > 0.999);
        assert!((0..1000).all(|n| (0.0..=1.0).contains(&flash(n, 120.0))));
    }

    #[test]
    fn depth_clears_to_far_plane() {
        let values = clear_values(0, 120.0);
        assert_eq!(unsafe { values[1].depth_stencil.depth }, 1.0);
        assert_eq!(unsafe { values[0].color.float32 }, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn origin_sits_two_units_in_front_of_camera() {
        let clip = mesh_matrix(0, EXTENT) * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(approx(clip.x, 0.0) && approx(clip.y, 0.0));
        assert!(approx(clip.w, 2.0));
    }

    #[test]
    fn y_axis_is_flipped() {
        let clip = mesh_matrix(0, EXTENT) * Vector4::new(0.0, 1.0, 0.0, 1.0);
        assert!(clip.y < 0.0);
    }

    #[test]
    fn mesh_turns_a_quarter_in_225_frames() {
        // (1,0,0) rotated 90 degrees around +Y ends up at (0,0,-1), one unit further away
        let clip = mesh_matrix(225, EXTENT) * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!(approx(clip.x, 0.0));
        assert!(approx(clip.w, 3.0));
    }

    #[test]
    fn animation_keeps_moving_after_days_of_frames() {
        let late = 1u64 << 30;
        let a = mesh_matrix(late, EXTENT) * Vector4::new(1.0, 0.0, 0.0, 1.0);
        let b = mesh_matrix(late + 1, EXTENT) * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!(!approx(a.x, b.x) || !approx(a.w, b.w));
        assert_ne!(flash(late, 120.0), flash(late + 1, 120.0));
    }

    #[test]
    fn rotation_wraps_after_a_full_turn() {
        let a = mesh_matrix(123, EXTENT) * Vector4::new(1.0, 0.0, 0.0, 1.0);
        let b = mesh_matrix(123 + ROTATION_FRAMES, EXTENT) * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!(approx(a.x, b.x) && approx(a.z, b.z) && approx(a.w, b.w));
    }

    #[test]
    fn degenerate_extent_does_not_produce_nan() {
        let m = mesh_matrix(10, vk::Extent2D { width: 0, height: 0 });
        let clip = m * Vector4::new(0.5, 0.5, 0.5, 1.0);
        assert!(!clip.x.is_nan() && !clip.y.is_nan());
    }

    #[test]
    fn scene_cycles_through_every_mode() {
        assert_eq!(Scene::default(), Scene::Mesh);
        assert_eq!(Scene::Mesh.toggled(), Scene::TriangleMesh);
        assert_eq!(Scene::TriangleMesh.toggled(), Scene::Triangle);
        assert_eq!(Scene::Mesh.toggled().toggled().toggled(), Scene::Mesh);
    }
}
