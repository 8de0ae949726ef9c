//! Flat bag of shading parameters

use serde::{Deserialize, Serialize};

use super::{
    DebugOutput, DiffuseTerm, FresnelTerm, GeometryTerm, LightingVariant, NormalDistributionTerm,
    RenderOutput,
};

/// Disney principled BRDF scalars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisneyParameters {
    pub subsurface: f32,
    pub metallic: f32,
    pub specular: f32,
    pub specular_tint: f32,
    /// UI range starts at 0.001
    pub roughness: f32,
    pub anisotropic: f32,
    pub sheen: f32,
    pub sheen_tint: f32,
    pub clearcoat: f32,
    pub clearcoat_gloss: f32,
}

impl Default for DisneyParameters {
    fn default() -> Self {
        Self {
            subsurface: 0.5,
            metallic: 0.5,
            specular: 0.5,
            specular_tint: 0.5,
            roughness: 0.5,
            anisotropic: 0.5,
            sheen: 0.5,
            sheen_tint: 0.5,
            clearcoat: 0.5,
            clearcoat_gloss: 0.5,
        }
    }
}

/// Every value the model shaders read besides geometry and lights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingParameters {
    pub lighting_variant: LightingVariant,
    pub blinn_phong_exponent: i32,
    pub ashikhmin_shirley_nu: i32,
    pub ashikhmin_shirley_nv: i32,
    pub diffuse_term: DiffuseTerm,
    pub fresnel_term: FresnelTerm,
    pub normal_distribution_term: NormalDistributionTerm,
    pub geometry_term: GeometryTerm,
    pub custom_material_values_enabled: bool,
    pub custom_metalness: f32,
    pub custom_roughness: f32,
    pub disney: DisneyParameters,
    pub shadows_enabled: bool,
    pub render_output: RenderOutput,
    pub debug_output: DebugOutput,
    pub gamma: f32,
    pub exposure: f32,
}

impl Default for ShadingParameters {
    fn default() -> Self {
        Self {
            lighting_variant: LightingVariant::CookTorrance,
            blinn_phong_exponent: 64,
            ashikhmin_shirley_nu: 500,
            ashikhmin_shirley_nv: 500,
            diffuse_term: DiffuseTerm::Burley,
            fresnel_term: FresnelTerm::Schlick,
            normal_distribution_term: NormalDistributionTerm::TrowbridgeReitzGgx,
            geometry_term: GeometryTerm::SeparableSchlickGgx,
            custom_material_values_enabled: false,
            custom_metalness: 0.5,
            custom_roughness: 0.5,
            disney: DisneyParameters::default(),
            shadows_enabled: true,
            render_output: RenderOutput::Color,
            debug_output: DebugOutput::NegativeNDotL,
            gamma: 2.2,
            exposure: 1.0,
        }
    }
}
