//! Point lights

use glam::{Mat4, Vec3};

use crate::constants::{LIGHT_COUNT, LIGHT_INTENSITY, LIGHT_POSITIONS};

/// A point light with unclamped HDR color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub active: bool,
}

impl PointLight {
    /// Create an inactive light at `position`
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            color: Vec3::splat(LIGHT_INTENSITY),
            active: false,
        }
    }

    /// Transform into the clip space of this light's shadow map
    ///
    /// The light looks at the origin with +Y up, or +Z up when it sits on the
    /// Y axis. A light at the origin looks down -Z.
    pub fn light_space_matrix(&self, shadow_projection: Mat4) -> Mat4 {
        let Some(to_light) = self.position.try_normalize() else {
            return shadow_projection * Mat4::look_to_rh(self.position, Vec3::NEG_Z, Vec3::Y);
        };
        let up = if to_light.dot(Vec3::Y).abs() > 0.999 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        shadow_projection * Mat4::look_at_rh(self.position, Vec3::ZERO, up)
    }
}

/// The fixed collection of lights used by a session
#[derive(Debug, Clone, PartialEq)]
pub struct LightSet {
    lights: [PointLight; LIGHT_COUNT],
}

impl Default for LightSet {
    fn default() -> Self {
        Self::new()
    }
}

impl LightSet {
    /// Four inactive white lights above the model
    pub fn new() -> Self {
        Self {
            lights: LIGHT_POSITIONS.map(|p| PointLight::new(Vec3::from(p))),
        }
    }

    /// Number of light slots
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Always false; the set has a fixed size
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Light in `slot`
    pub fn get(&self, slot: usize) -> Option<&PointLight> {
        self.lights.get(slot)
    }

    /// Iterate over all lights in slot order
    pub fn iter(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.iter()
    }

    /// Activate or deactivate the light in `slot`
    pub fn set_active(&mut self, slot: usize, active: bool) {
        match self.lights.get_mut(slot) {
            Some(light) => {
                light.active = active;
                tracing::debug!("Light {} {}", slot, if active { "on" } else { "off" });
            }
            None => tracing::warn!("Light slot {} out of range", slot),
        }
    }

    /// Move the light in `slot`
    pub fn set_position(&mut self, slot: usize, position: Vec3) {
        if let Some(light) = self.lights.get_mut(slot) {
            light.position = position;
        }
    }

    /// Set the color of every light; `rgb` is scaled to the light intensity
    pub fn set_color(&mut self, rgb: Vec3) {
        for light in &mut self.lights {
            light.color = rgb * LIGHT_INTENSITY;
        }
    }

    /// Number of lights currently switched on
    pub fn active_count(&self) -> usize {
        self.lights.iter().filter(|l| l.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lights_inactive() {
        let set = LightSet::new();
        assert_eq!(set.len(), 4);
        assert_eq!(set.active_count(), 0);
        assert_eq!(set.get(1).map(|l| l.position), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert!(set.iter().all(|l| l.color == Vec3::splat(5.0)));
    }

    #[test]
    fn test_set_color_scales_intensity() {
        let mut set = LightSet::new();
        set.set_color(Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(set.get(3).map(|l| l.color), Some(Vec3::new(5.0, 2.5, 0.0)));
    }

    #[test]
    fn test_toggle_and_out_of_range() {
        let mut set = LightSet::new();
        set.set_active(2, true);
        set.set_active(9, true);
        assert_eq!(set.active_count(), 1);
        assert!(set.get(2).is_some_and(|l| l.active));
        set.set_active(2, false);
        assert_eq!(set.active_count(), 0);
    }

    #[test]
    fn test_light_on_vertical_axis_has_finite_matrix() {
        let projection = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 10.0);
        for position in [Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0), Vec3::ZERO] {
            let light = PointLight::new(position);
            let m = light.light_space_matrix(projection);
            assert!(m.is_finite(), "{position:?} gives {m:?}");
        }

        // The origin still projects to the center of the map
        let light = PointLight::new(Vec3::new(0.0, 2.0, 0.0));
        let clip = light.light_space_matrix(projection) * Vec3::ZERO.extend(1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
    }
}
