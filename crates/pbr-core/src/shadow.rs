//! Shadow map projection

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::constants::{SHADOW_FAR, SHADOW_MAP_SIZE, SHADOW_NEAR};

/// Perspective shared by every light's shadow map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowProjection {
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowProjection {
    fn default() -> Self {
        Self {
            width: SHADOW_MAP_SIZE,
            height: SHADOW_MAP_SIZE,
            near: SHADOW_NEAR,
            far: SHADOW_FAR,
        }
    }
}

impl ShadowProjection {
    /// Width over height; a zero height counts as one
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// 90 degree perspective through the configured near/far planes
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(90.0_f32.to_radians(), self.aspect(), self.near, self.far)
    }
}
