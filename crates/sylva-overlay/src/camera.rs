//! Camera state consumed and produced by the overlay projector.

use glam::{DMat4, DVec3};

/// Render-to-texture camera that draws the overlay graph into the
/// projected texture. Rendered before the main scene.
#[derive(Clone, Debug, PartialEq)]
pub struct RttCamera {
    /// Viewport as `[x, y, width, height]`.
    pub viewport: [u32; 4],
    /// RGBA clear color. Transparent so untouched texels don't tint the terrain.
    pub clear_color: [f32; 4],
    /// World-to-eye transform.
    pub view: DMat4,
    /// Orthographic projection.
    pub projection: DMat4,
}

impl RttCamera {
    /// A camera rendering into a `texture_size` x `texture_size` target.
    pub fn new(texture_size: u32) -> Self {
        Self {
            viewport: [0, 0, texture_size, texture_size],
            clear_color: [0.0; 4],
            view: DMat4::IDENTITY,
            projection: DMat4::IDENTITY,
        }
    }
}

/// What the cull pass knows about the main camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullView {
    /// Eye position in world (earth-centered) coordinates.
    pub eye: DVec3,
    /// World-to-eye transform of the main camera.
    pub view: DMat4,
    /// Perspective projection of the main camera.
    pub projection: DMat4,
}

impl CullView {
    /// Builds a view looking from `eye` towards `target`, with a GL-style
    /// perspective of vertical field of view `fov_y` (radians).
    pub fn looking_at(eye: DVec3, target: DVec3, up: DVec3, fov_y: f64, aspect_ratio: f64) -> Self {
        Self {
            eye,
            view: DMat4::look_at_rh(eye, target, up),
            projection: DMat4::perspective_rh_gl(fov_y, aspect_ratio, 1.0, 1.0e8),
        }
    }

    /// Unit look direction of the main camera in world space.
    pub fn look_direction(&self) -> DVec3 {
        self.view
            .inverse()
            .transform_vector3(DVec3::NEG_Z)
            .normalize_or_zero()
    }

    /// `tan(fov_y / 2)` recovered from the perspective matrix, if it is one.
    pub fn half_fov_tangent(&self) -> Option<f64> {
        let cot = self.projection.y_axis.y;
        (cot.is_finite() && cot > 0.0).then(|| 1.0 / cot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_look_direction() {
        let view = CullView::looking_at(DVec3::new(10.0, 0.0, 0.0), DVec3::ZERO, DVec3::Z, 1.0, 1.0);
        assert!((view.look_direction() - DVec3::NEG_X).length() < 1e-12);
    }

    #[test]
    fn test_half_fov_tangent() {
        let view = CullView::looking_at(DVec3::X, DVec3::ZERO, DVec3::Z, FRAC_PI_2, 1.5);
        assert!((view.half_fov_tangent().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rtt_camera_viewport() {
        let camera = RttCamera::new(512);
        assert_eq!(camera.viewport, [0, 0, 512, 512]);
        assert_eq!(camera.clear_color, [0.0, 0.0, 0.0, 0.0]);
    }
}
