//! Viewer configuration structures
//!
//! Settings that can be serialized to and loaded from RON files. Every
//! section falls back to its defaults when missing from the file.

use std::path::Path;

use pbr_core::ShadingParameters;
use pbr_core::constants::{
    BRDF_LUT_SIZE, ENVIRONMENT_FACE_SIZE, IMPORTANCE_SAMPLE_COUNT, IRRADIANCE_FACE_SIZE,
    IRRADIANCE_SAMPLE_DELTA, PREFILTER_FACE_SIZE, PREFILTER_MIP_LEVELS, SHADOW_FAR,
    SHADOW_MAP_SIZE, SHADOW_NEAR,
};
use serde::{Deserialize, Serialize};

/// Image-based-lighting bake settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Edge length of each environment cube face
    pub face_size: u32,
    /// Edge length of each irradiance cube face
    pub irradiance_size: u32,
    /// Edge length of mip 0 of the prefiltered cube
    pub prefilter_size: u32,
    /// Number of prefiltered roughness levels
    pub prefilter_mip_levels: u32,
    /// Edge length of the BRDF lookup texture
    pub brdf_lut_size: u32,
    /// Samples per texel for prefiltering and BRDF integration
    pub sample_count: u32,
    /// Angular step of the irradiance convolution (radians)
    pub irradiance_sample_delta: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            face_size: ENVIRONMENT_FACE_SIZE,
            irradiance_size: IRRADIANCE_FACE_SIZE,
            prefilter_size: PREFILTER_FACE_SIZE,
            prefilter_mip_levels: PREFILTER_MIP_LEVELS,
            brdf_lut_size: BRDF_LUT_SIZE,
            sample_count: IMPORTANCE_SAMPLE_COUNT,
            irradiance_sample_delta: IRRADIANCE_SAMPLE_DELTA,
        }
    }
}

impl EnvironmentConfig {
    /// Reject settings the bake shaders cannot run with
    ///
    /// A non-positive step never ends the irradiance loop and zero samples
    /// divide by zero in the prefilter and BRDF passes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("face_size", self.face_size),
            ("irradiance_size", self.irradiance_size),
            ("prefilter_size", self.prefilter_size),
            ("prefilter_mip_levels", self.prefilter_mip_levels),
            ("brdf_lut_size", self.brdf_lut_size),
            ("sample_count", self.sample_count),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("environment.{name} must be positive")));
        }
        let delta = self.irradiance_sample_delta;
        if !(delta.is_finite() && delta > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "environment.irradiance_sample_delta must be positive, got {delta}"
            )));
        }
        Ok(())
    }
}

/// Shadow mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowConfig {
    /// Shadow map resolution per light
    pub map_size: u32,
    /// Near plane of the light projection
    pub near: f32,
    /// Far plane of the light projection
    pub far: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: SHADOW_MAP_SIZE,
            near: SHADOW_NEAR,
            far: SHADOW_FAR,
        }
    }
}

impl ShadowConfig {
    /// Reject an empty map or an inverted depth range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_size == 0 {
            return Err(ConfigError::Invalid("shadow.map_size must be positive".to_string()));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ConfigError::Invalid(format!(
                "shadow planes must satisfy 0 < near < far, got {} and {}",
                self.near, self.far
            )));
        }
        Ok(())
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Field of view in degrees
    pub fov_degrees: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Distance from the orbit center
    pub distance: f32,
    /// Orbit yaw in degrees
    pub yaw_degrees: f32,
    /// Orbit pitch in degrees
    pub pitch_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 50.0,
            distance: 3.0,
            yaw_degrees: 90.0,
            pitch_degrees: 0.0,
        }
    }
}

/// Point light configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightsConfig {
    /// Light slots switched on at startup
    pub active: Vec<usize>,
    /// Base color (RGB), scaled by the light intensity
    pub color: [f32; 3],
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Scene configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Loaded models are centered and scaled into this radius (0 keeps them as-is)
    pub fit_radius: f32,
    /// Background clear color (RGBA)
    pub background_color: [f32; 4],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fit_radius: 0.5,
            background_color: [0.1, 0.1, 0.1, 1.0],
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// IBL bake settings
    pub environment: EnvironmentConfig,
    /// Shadow settings
    pub shadow: ShadowConfig,
    /// Camera settings
    pub camera: CameraConfig,
    /// Light settings
    pub lights: LightsConfig,
    /// Scene settings
    pub scene: SceneConfig,
    /// Initial shading parameters
    pub shading: ShadingParameters,
}

impl ViewerConfig {
    /// Save configuration to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Load and validate configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse and validate RON text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section that feeds GPU resources
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.environment.validate()?;
        self.shadow.validate()
    }
}

/// Configuration file errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(String),
    /// Configuration could not be encoded
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// File contents are not a valid configuration
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    /// A value is outside the range the renderer supports
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbr_core::LightingVariant;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.ron");

        let mut config = ViewerConfig::default();
        config.shadow.map_size = 1024;
        config.lights.active = vec![0, 2];
        config.shading.lighting_variant = LightingVariant::Disney;
        config.save(&path).unwrap();

        let loaded = ViewerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: ViewerConfig = ron::from_str("(shadow: (map_size: 512))").unwrap();
        assert_eq!(config.shadow.map_size, 512);
        assert_eq!(config.shadow.far, 2.0);
        assert_eq!(config.environment.face_size, 2048);
        assert_eq!(config.shading.blinn_phong_exponent, 64);
        assert_eq!(config.camera.fov_degrees, 45.0);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ViewerConfig::load("no/such/viewer.ron"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_zero_irradiance_step_is_rejected() {
        let result = ViewerConfig::parse("(environment: (irradiance_sample_delta: 0.0))");
        assert!(matches!(result, Err(ConfigError::Invalid(ref m)) if m.contains("irradiance_sample_delta")));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.ron");
        std::fs::write(&path, "(environment: (irradiance_sample_delta: -0.1))").unwrap();
        assert!(matches!(ViewerConfig::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_sizes_and_samples_are_rejected() {
        for text in [
            "(environment: (sample_count: 0))",
            "(environment: (face_size: 0))",
            "(environment: (prefilter_mip_levels: 0))",
            "(shadow: (map_size: 0))",
            "(shadow: (near: 1.0, far: 0.5))",
        ] {
            assert!(
                matches!(ViewerConfig::parse(text), Err(ConfigError::Invalid(_))),
                "{text} was accepted"
            );
        }
        assert!(ViewerConfig::default().validate().is_ok());
        assert!(ViewerConfig::parse("(shadow: (map_size: 512))").is_ok());
    }
}
