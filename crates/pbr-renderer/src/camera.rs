//! Arcball camera orbiting the model

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Orbit camera, Y up
pub struct ArcballCamera {
    /// Eye position
    pub position: Vec3,
    /// Orbit center
    pub target: Vec3,
    /// World up
    pub up: Vec3,
    /// Vertical field of view (radians)
    pub fov: f32,
    /// Width over height
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    // Orbit state
    /// Angle around Y from +X (radians)
    pub yaw: f32,
    /// Elevation (radians)
    pub pitch: f32,
    /// Distance from the target
    pub distance: f32,
}

impl ArcballCamera {
    /// Create a camera from configuration for a `width` x `height` target
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: config.fov_degrees.to_radians(),
            aspect: 1.0,
            near: config.near,
            far: config.far,
            yaw: config.yaw_degrees.to_radians(),
            pitch: config.pitch_degrees.to_radians(),
            distance: config.distance,
        };
        camera.resize(width, height);
        camera.update_position_from_orbit();
        camera
    }

    /// Update the aspect ratio; a zero height counts as one
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Orbit the camera around the target
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch =
            (self.pitch + delta_pitch).clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
        self.update_position_from_orbit();
    }

    /// Zoom the camera
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta * 0.1)).clamp(0.1, self.far * 0.5);
        self.update_position_from_orbit();
    }

    fn update_position_from_orbit(&mut self) {
        let x = self.distance * self.pitch.cos() * self.yaw.cos();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.sin();
        self.position = self.target + Vec3::new(x, y, z);
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_camera_looks_down_negative_z() {
        let camera = ArcballCamera::new(&CameraConfig::default(), 800, 600);
        assert_relative_eq!(camera.position.z, 3.0, epsilon = 1e-5);
        assert_relative_eq!(camera.position.x, 0.0, epsilon = 1e-5);
        let forward = camera.view_matrix().transform_vector3(Vec3::NEG_Z);
        assert_relative_eq!(forward.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_height_is_guarded() {
        let camera = ArcballCamera::new(&CameraConfig::default(), 64, 0);
        assert_eq!(camera.aspect, 64.0);
        assert!(camera.projection_matrix().is_finite());
    }

    #[test]
    fn test_orbit_clamps_pitch() {
        let mut camera = ArcballCamera::new(&CameraConfig::default(), 1, 1);
        camera.orbit(0.0, 10.0);
        assert_relative_eq!(camera.pitch, 89.0_f32.to_radians());
        assert_relative_eq!(camera.position.length(), 3.0, epsilon = 1e-4);
    }
}
