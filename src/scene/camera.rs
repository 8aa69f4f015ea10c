//! Camera system

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Narrowest field of view reachable by zooming, in degrees
pub const MIN_FOV_DEGREES: f32 = 1.0;
/// Widest field of view reachable by zooming, in degrees
pub const MAX_FOV_DEGREES: f32 = 45.0;

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Projection {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_y.to_degrees()
    }
}

/// Camera for viewing the terrain
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }

    /// Camera that frames an axis-aligned box from above and to the side
    pub fn framing(min: Vec3, max: Vec3) -> Self {
        let center = (min + max) * 0.5;
        let extent = (max - min).length().max(1e-3);
        let mut camera = Self::new(
            center + Vec3::new(0.0, extent * 0.6, extent * 1.1),
            center,
        );
        camera.projection.near = extent * 1e-3;
        camera.projection.far = extent * 20.0;
        camera
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get the forward direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Narrow (positive `delta`) or widen the field of view by `delta`
    /// degrees, clamped to [`MIN_FOV_DEGREES`, `MAX_FOV_DEGREES`]
    pub fn zoom(&mut self, delta: f32) {
        let fov = (self.projection.fov_degrees() - delta).clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES);
        self.projection.fov_y = fov.to_radians();
    }

    /// Build camera uniform data for shaders
    pub fn uniform_data(&self) -> CameraUniformData {
        CameraUniformData {
            view_proj: self.view_projection_matrix(),
            position: self.position.extend(1.0),
        }
    }

    /// Update aspect ratio for perspective projection
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.projection.set_aspect(width / height);
        }
    }
}

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view_proj: Mat4,
    pub position: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamps_fov() {
        let mut camera = Camera::default();
        camera.zoom(100.0);
        assert!((camera.projection.fov_degrees() - MIN_FOV_DEGREES).abs() < 1e-4);
        camera.zoom(-100.0);
        assert!((camera.projection.fov_degrees() - MAX_FOV_DEGREES).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_steps() {
        let mut camera = Camera::default();
        camera.zoom(5.0);
        assert!((camera.projection.fov_degrees() - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_set_aspect_ignores_zero_size() {
        let mut camera = Camera::default();
        camera.set_aspect(800.0, 0.0);
        assert_eq!(camera.projection.aspect, 16.0 / 9.0);
        camera.set_aspect(800.0, 400.0);
        assert_eq!(camera.projection.aspect, 2.0);
    }

    #[test]
    fn test_framing_looks_at_center() {
        let camera = Camera::framing(Vec3::ZERO, Vec3::new(2.0, 1.0, 2.0));
        assert_eq!(camera.target, Vec3::new(1.0, 0.5, 1.0));
        assert!(camera.position.y > camera.target.y);
        assert!(camera.projection.far > camera.position.distance(camera.target));
    }

    #[test]
    fn test_view_projection_maps_target_to_center() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
    }
}
