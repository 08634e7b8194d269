//! Orthographic camera and per-frame uniform data.

use glam::Mat4;

/// Pixel-space orthographic camera.
///
/// Projects `(0, 0)..(width, height)` onto the full viewport so the quad's
/// vertex coordinates can stay in pixels.
#[derive(Debug, Clone, Copy)]
pub struct OrthoCamera {
    pub width: f32,
    pub height: f32,
}

impl OrthoCamera {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(0.0, self.width, 0.0, self.height, -1.0, 1.0)
    }

    /// Uniform data for the GPU.
    pub fn uniforms(&self) -> FrameUniforms {
        FrameUniforms {
            view: self.view_matrix().to_cols_array_2d(),
            proj: self.projection_matrix().to_cols_array_2d(),
        }
    }
}

impl Default for OrthoCamera {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Uniform buffer contents, std140-compatible.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4;

    #[test]
    fn uniforms_are_two_packed_matrices() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 128);
    }

    #[test]
    fn projection_maps_pixel_corners_to_clip_corners() {
        let camera = OrthoCamera::default();
        let proj = camera.projection_matrix();

        let origin = proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin.x, -1.0);
        assert_relative_eq!(origin.y, -1.0);

        let far_corner = proj * Vec4::new(1280.0, 720.0, 0.0, 1.0);
        assert_relative_eq!(far_corner.x, 1.0);
        assert_relative_eq!(far_corner.y, 1.0);
    }

    #[test]
    fn view_is_identity() {
        let camera = OrthoCamera::default();
        assert_eq!(camera.view_matrix(), Mat4::IDENTITY);
    }
}
