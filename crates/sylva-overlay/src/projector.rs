//! RTT frustum sizing and projective texture coordinate generation.

use glam::{DMat4, DVec3, DVec4};

use crate::camera::{CullView, RttCamera};
use crate::ellipsoid::Ellipsoid;

/// Default overlay texture width and height in texels.
pub const DEFAULT_TEXTURE_SIZE: u32 = 1024;
/// Default texture unit the overlay is projected on.
pub const DEFAULT_TEXTURE_UNIT: u32 = 1;

/// Extra height applied to the height above the ellipsoid, since the
/// horizon estimate treats the ellipsoid as a sphere of equatorial radius.
const HEIGHT_ADJUSTMENT: f64 = 1.5;

/// Near plane of the RTT camera's orthographic frustum.
const RTT_NEAR: f64 = 1.0;

/// Maps clip space `[-1, 1]` to texture space `[0, 1]`.
fn clip_to_texture() -> DMat4 {
    DMat4::from_scale(DVec3::splat(0.5)) * DMat4::from_translation(DVec3::ONE)
}

/// Drives the RTT camera for a projected overlay.
///
/// Two passes run every frame. [`cull`](Self::cull) recomputes the camera
/// from the main view: looking straight down at the earth's center from the
/// eye, with an orthographic extent between what a nadir-pointing camera
/// would see and the distance to the horizon. [`update`](Self::update)
/// pushes the cached matrices into the [`RttCamera`] and regenerates the
/// texture-generation planes.
#[derive(Debug)]
pub struct OverlayProjector {
    ellipsoid: Ellipsoid,
    texture_size: u32,
    texture_unit: u32,
    camera: RttCamera,
    rtt_view: DMat4,
    rtt_projection: DMat4,
    projector_view: DMat4,
    projector_projection: DMat4,
    tex_gen_planes: [DVec4; 4],
    extent: f64,
}

impl OverlayProjector {
    /// Creates a projector over `ellipsoid` rendering into a square texture.
    pub fn new(ellipsoid: Ellipsoid, texture_size: u32, texture_unit: u32) -> Self {
        log::info!("Overlay texture size {texture_size}, unit {texture_unit}");
        let mut projector = Self {
            ellipsoid,
            texture_size,
            texture_unit,
            camera: RttCamera::new(texture_size),
            rtt_view: DMat4::IDENTITY,
            rtt_projection: DMat4::IDENTITY,
            projector_view: DMat4::IDENTITY,
            projector_projection: DMat4::IDENTITY,
            tex_gen_planes: [DVec4::ZERO; 4],
            extent: 0.0,
        };
        projector.update_tex_gen_planes();
        projector
    }

    fn reinit(&mut self) {
        self.camera = RttCamera::new(self.texture_size);
    }

    /// Changes the overlay texture size, rebuilding the RTT camera.
    pub fn set_texture_size(&mut self, texture_size: u32) {
        if texture_size != self.texture_size {
            self.texture_size = texture_size;
            self.reinit();
        }
    }

    /// Changes the texture unit the overlay is projected on, rebuilding the RTT camera.
    pub fn set_texture_unit(&mut self, texture_unit: u32) {
        if texture_unit != self.texture_unit {
            self.texture_unit = texture_unit;
            self.reinit();
        }
    }

    /// Overlay texture size in texels.
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Texture unit the overlay is projected on.
    pub fn texture_unit(&self) -> u32 {
        self.texture_unit
    }

    /// The RTT camera as of the last [`update`](Self::update).
    pub fn camera(&self) -> &RttCamera {
        &self.camera
    }

    /// Half-width of the RTT frustum computed by the last successful cull.
    pub fn extent(&self) -> f64 {
        self.extent
    }

    /// Update pass: applies the matrices from the last cull.
    pub fn update(&mut self) {
        self.camera.view = self.rtt_view;
        self.camera.projection = self.rtt_projection;
        self.update_tex_gen_planes();
    }

    fn update_tex_gen_planes(&mut self) {
        let matrix = self.tex_gen_matrix();
        self.tex_gen_planes = [matrix.row(0), matrix.row(1), matrix.row(2), matrix.row(3)];
    }

    fn tex_gen_matrix(&self) -> DMat4 {
        clip_to_texture() * self.projector_projection * self.projector_view
    }

    /// Cull pass: re-aims and re-sizes the RTT camera for the main view.
    ///
    /// Returns `false`, leaving the previous matrices in place, when the eye
    /// is at or below the ellipsoid's equatorial radius.
    pub fn cull(&mut self, view: &CullView) -> bool {
        let re = self.ellipsoid.radius_equator;
        let eye = view.eye;
        let eye_len = eye.length();

        let hae = eye_len - re;
        if !hae.is_finite() || hae <= 0.0 {
            log::debug!("Eye {eye_len:.1} m from center is inside the ellipsoid; keeping overlay frustum");
            return false;
        }
        let hae_adj = hae * HEIGHT_ADJUSTMENT;

        // Distance to the horizon bounds the extent from above.
        let e_max = (hae_adj * hae_adj + 2.0 * re * hae_adj).sqrt();
        // What a nadir-pointing camera sees bounds it from below.
        let e_min = view
            .half_fov_tangent()
            .map_or(e_max, |tangent| (hae_adj * tangent).min(e_max));

        let rtt_look = (-eye).normalize();
        let deviation = rtt_look.cross(view.look_direction()).length().min(1.0);
        let extent = e_min + deviation * (e_max - e_min);

        // Straight down. Z-up degenerates over the poles.
        let up = if rtt_look.cross(DVec3::Z).length_squared() > 1e-12 {
            DVec3::Z
        } else {
            DVec3::Y
        };
        self.rtt_view = DMat4::look_at_rh(eye, DVec3::ZERO, up);
        self.rtt_projection =
            DMat4::orthographic_rh_gl(-extent, extent, -extent, extent, RTT_NEAR, eye_len);

        // The projector sees exactly what the RTT camera rendered.
        self.projector_view = self.rtt_view;
        self.projector_projection = self.rtt_projection;
        self.extent = extent;

        log::trace!("Overlay deviation {deviation:.3}, extent {extent:.1} m");
        true
    }

    /// Eye-linear texture generation planes for S, T, R and Q.
    pub fn tex_gen_planes(&self) -> &[DVec4; 4] {
        &self.tex_gen_planes
    }

    /// Projective texture coordinate of a world point, after the divide by Q.
    pub fn project_to_texture(&self, world: DVec3) -> DVec3 {
        let point = world.extend(1.0);
        let [s, t, r, q] = self.tex_gen_planes.map(|plane| plane.dot(point));
        DVec3::new(s, t, r) / q
    }

    /// The RTT camera's cached view matrix.
    pub fn rtt_view(&self) -> DMat4 {
        self.rtt_view
    }

    /// The RTT camera's cached projection matrix.
    pub fn rtt_projection(&self) -> DMat4 {
        self.rtt_projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const RADIUS: f64 = 1_000_000.0;
    const HEIGHT: f64 = 1_000.0;

    fn projector() -> OverlayProjector {
        OverlayProjector::new(Ellipsoid::sphere(RADIUS), 256, 1)
    }

    fn eye() -> DVec3 {
        DVec3::new(RADIUS + HEIGHT, 0.0, 0.0)
    }

    #[test]
    fn test_nadir_view_uses_minimum_extent() {
        let mut projector = projector();
        let view = CullView::looking_at(eye(), DVec3::ZERO, DVec3::Z, FRAC_PI_2, 1.0);
        assert!(projector.cull(&view));
        // tan(45 deg) = 1, so the extent is the adjusted height.
        assert!((projector.extent() - 1_500.0).abs() < 1e-6);
        assert!((projector.rtt_projection().x_axis.x - 1.0 / 1_500.0).abs() < 1e-12);
    }

    #[test]
    fn test_horizontal_view_uses_horizon_distance() {
        let mut projector = projector();
        let view = CullView::looking_at(eye(), eye() + DVec3::Y, DVec3::X, FRAC_PI_2, 1.0);
        assert!(projector.cull(&view));
        let hae_adj = HEIGHT * HEIGHT_ADJUSTMENT;
        let horizon = (hae_adj * hae_adj + 2.0 * RADIUS * hae_adj).sqrt();
        assert!((projector.extent() - horizon).abs() < 1e-6);
    }

    #[test]
    fn test_extent_grows_with_pitch() {
        let mut projector = projector();
        let mut last = 0.0;
        for pitch in [0.0_f64, 0.3, 0.6, 0.9, 1.2] {
            let look = DVec3::new(-pitch.cos(), pitch.sin(), 0.0);
            let view = CullView::looking_at(eye(), eye() + look, DVec3::Z, 1.0, 1.0);
            assert!(projector.cull(&view));
            assert!(projector.extent() > last);
            last = projector.extent();
        }
    }

    #[test]
    fn test_update_projects_nadir_to_texture_center() {
        let mut projector = projector();
        let view = CullView::looking_at(eye(), DVec3::ZERO, DVec3::Z, 1.0, 1.0);
        projector.cull(&view);
        projector.update();

        assert_eq!(projector.camera().view, projector.rtt_view());
        assert_eq!(projector.camera().projection, projector.rtt_projection());

        let uv = projector.project_to_texture(DVec3::new(RADIUS, 0.0, 0.0));
        assert!((uv.x - 0.5).abs() < 1e-9);
        assert!((uv.y - 0.5).abs() < 1e-9);
        assert!(uv.z > 0.0 && uv.z < 1.0);
    }

    #[test]
    fn test_matrices_wait_for_update() {
        let mut projector = projector();
        let view = CullView::looking_at(eye(), DVec3::ZERO, DVec3::Z, 1.0, 1.0);
        projector.cull(&view);
        assert_eq!(projector.camera().view, DMat4::IDENTITY);
        projector.update();
        assert_ne!(projector.camera().view, DMat4::IDENTITY);
    }

    #[test]
    fn test_eye_inside_ellipsoid_keeps_frustum() {
        let mut projector = projector();
        let view = CullView::looking_at(eye(), DVec3::ZERO, DVec3::Z, 1.0, 1.0);
        projector.cull(&view);
        let extent = projector.extent();

        let below = DVec3::new(RADIUS - 10.0, 0.0, 0.0);
        let underground = CullView::looking_at(below, DVec3::ZERO, DVec3::Z, 1.0, 1.0);
        assert!(!projector.cull(&underground));
        assert_eq!(projector.extent(), extent);
    }

    #[test]
    fn test_polar_eye_is_well_defined() {
        let mut projector = projector();
        let eye = DVec3::new(0.0, 0.0, RADIUS + HEIGHT);
        let view = CullView::looking_at(eye, DVec3::ZERO, DVec3::Y, 1.0, 1.0);
        assert!(projector.cull(&view));
        assert!(projector.rtt_view().is_finite());
    }

    #[test]
    fn test_texture_size_change_reinitializes_camera() {
        let mut projector = projector();
        let view = CullView::looking_at(eye(), DVec3::ZERO, DVec3::Z, 1.0, 1.0);
        projector.cull(&view);
        projector.update();

        projector.set_texture_size(2048);
        assert_eq!(projector.camera().viewport, [0, 0, 2048, 2048]);
        assert_eq!(projector.camera().view, DMat4::IDENTITY);

        projector.update();
        assert_eq!(projector.camera().view, projector.rtt_view());
        assert_eq!(projector.camera().viewport[2], projector.texture_size());
    }

    #[test]
    fn test_texture_unit_change_reinitializes_camera() {
        let mut projector = projector();
        let view = CullView::looking_at(eye(), DVec3::ZERO, DVec3::Z, 1.0, 1.0);
        projector.cull(&view);
        projector.update();

        projector.set_texture_unit(1);
        assert_ne!(projector.camera().view, DMat4::IDENTITY);

        projector.set_texture_unit(3);
        assert_eq!(projector.texture_unit(), 3);
        assert_eq!(projector.camera().view, DMat4::IDENTITY);
        assert_eq!(projector.camera().viewport, [0, 0, 256, 256]);
    }

    #[test]
    fn test_initial_planes_map_clip_origin_to_center() {
        let projector = projector();
        let uv = projector.project_to_texture(DVec3::ZERO);
        assert_eq!(uv, DVec3::splat(0.5));
    }
}
