//! Global constants for pbr-core

/// Edge length of each environment cubemap face in texels
pub const ENVIRONMENT_FACE_SIZE: u32 = 2048;

/// Edge length of each irradiance cubemap face in texels
pub const IRRADIANCE_FACE_SIZE: u32 = 32;

/// Edge length of mip 0 of the prefiltered environment cubemap
pub const PREFILTER_FACE_SIZE: u32 = 512;

/// Number of roughness levels stored in the prefiltered environment mip chain
pub const PREFILTER_MIP_LEVELS: u32 = 5;

/// Edge length of the BRDF integration lookup texture
pub const BRDF_LUT_SIZE: u32 = 512;

/// Quasi-random sample count used by the prefilter and BRDF integration passes
pub const IMPORTANCE_SAMPLE_COUNT: u32 = 1024;

/// Hemisphere step used by the irradiance convolution (radians)
pub const IRRADIANCE_SAMPLE_DELTA: f32 = 0.025;

/// Near plane of the cube capture projection
pub const CAPTURE_NEAR: f32 = 0.1;

/// Far plane of the cube capture projection
pub const CAPTURE_FAR: f32 = 10.0;

/// Default shadow map edge length in texels
pub const SHADOW_MAP_SIZE: u32 = 4096;

/// Default near plane of the shadow projection
pub const SHADOW_NEAR: f32 = 0.1;

/// Default far plane of the shadow projection
pub const SHADOW_FAR: f32 = 2.0;

/// Number of point lights in a session
pub const LIGHT_COUNT: usize = 4;

/// Multiplier applied to colors picked for the point lights
pub const LIGHT_INTENSITY: f32 = 5.0;

/// Default light positions (one per slot)
pub const LIGHT_POSITIONS: [[f32; 3]; LIGHT_COUNT] = [
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
];
