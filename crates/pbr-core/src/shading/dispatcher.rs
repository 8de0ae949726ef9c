//! Lighting variant state machine and per-frame uniform marshalling

use glam::{Mat4, Vec3};

use super::{
    DebugOutput, DiffuseTerm, FresnelTerm, GeometryTerm, LightingVariant, NormalDistributionTerm,
    ProgramKind, RenderOutput, ShadingParameters,
};
use crate::light::LightSet;
use crate::uniform::UniformTarget;

/// Camera and model state for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
}

/// Owns the shading parameters and decides what the model draw uses
///
/// The active [`LightingVariant`] is the only source of truth for which
/// model is shown; selecting one implicitly deactivates the others.
#[derive(Debug, Clone, Default)]
pub struct ShadingDispatcher {
    params: ShadingParameters,
}

impl ShadingDispatcher {
    /// Dispatcher with default parameters (Cook-Torrance active)
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher starting from `params`
    pub fn with_parameters(params: ShadingParameters) -> Self {
        Self { params }
    }

    /// Current parameter values
    pub fn parameters(&self) -> &ShadingParameters {
        &self.params
    }

    /// Make `variant` the active lighting model
    pub fn select(&mut self, variant: LightingVariant) {
        if self.params.lighting_variant != variant {
            tracing::debug!(
                "Lighting variant {:?} -> {:?}",
                self.params.lighting_variant,
                variant
            );
        }
        self.params.lighting_variant = variant;
    }

    /// Switch `variant` on or off; turning off the active one leaves no lighting
    pub fn toggle(&mut self, variant: LightingVariant, enabled: bool) {
        if enabled {
            self.select(variant);
        } else if self.is_active(variant) {
            self.select(LightingVariant::NoLighting);
        }
    }

    /// Active lighting model
    pub fn current_variant(&self) -> LightingVariant {
        self.params.lighting_variant
    }

    /// True if `variant` is the active lighting model
    pub fn is_active(&self, variant: LightingVariant) -> bool {
        self.params.lighting_variant == variant
    }

    /// Program the next model draw binds
    pub fn current_program(&self) -> ProgramKind {
        self.params.lighting_variant.program()
    }

    pub fn set_blinn_phong_exponent(&mut self, value: i32) {
        self.params.blinn_phong_exponent = value;
    }

    pub fn set_ashikhmin_shirley_nu(&mut self, value: i32) {
        self.params.ashikhmin_shirley_nu = value;
    }

    pub fn set_ashikhmin_shirley_nv(&mut self, value: i32) {
        self.params.ashikhmin_shirley_nv = value;
    }

    pub fn set_diffuse_term(&mut self, term: DiffuseTerm) {
        self.params.diffuse_term = term;
    }

    pub fn set_fresnel_term(&mut self, term: FresnelTerm) {
        self.params.fresnel_term = term;
    }

    pub fn set_normal_distribution_term(&mut self, term: NormalDistributionTerm) {
        self.params.normal_distribution_term = term;
    }

    pub fn set_geometry_term(&mut self, term: GeometryTerm) {
        self.params.geometry_term = term;
    }

    pub fn set_custom_material_values_enabled(&mut self, enabled: bool) {
        self.params.custom_material_values_enabled = enabled;
    }

    pub fn set_custom_metalness(&mut self, value: f32) {
        self.params.custom_metalness = value;
    }

    pub fn set_custom_roughness(&mut self, value: f32) {
        self.params.custom_roughness = value;
    }

    pub fn set_disney_subsurface(&mut self, value: f32) {
        self.params.disney.subsurface = value;
    }

    pub fn set_disney_metallic(&mut self, value: f32) {
        self.params.disney.metallic = value;
    }

    pub fn set_disney_specular(&mut self, value: f32) {
        self.params.disney.specular = value;
    }

    pub fn set_disney_specular_tint(&mut self, value: f32) {
        self.params.disney.specular_tint = value;
    }

    pub fn set_disney_roughness(&mut self, value: f32) {
        self.params.disney.roughness = value;
    }

    pub fn set_disney_anisotropic(&mut self, value: f32) {
        self.params.disney.anisotropic = value;
    }

    pub fn set_disney_sheen(&mut self, value: f32) {
        self.params.disney.sheen = value;
    }

    pub fn set_disney_sheen_tint(&mut self, value: f32) {
        self.params.disney.sheen_tint = value;
    }

    pub fn set_disney_clearcoat(&mut self, value: f32) {
        self.params.disney.clearcoat = value;
    }

    pub fn set_disney_clearcoat_gloss(&mut self, value: f32) {
        self.params.disney.clearcoat_gloss = value;
    }

    pub fn set_shadows_enabled(&mut self, enabled: bool) {
        self.params.shadows_enabled = enabled;
    }

    pub fn set_render_output(&mut self, output: RenderOutput) {
        self.params.render_output = output;
    }

    pub fn set_debug_output(&mut self, output: DebugOutput) {
        self.params.debug_output = output;
    }

    pub fn set_gamma(&mut self, value: f32) {
        self.params.gamma = value;
    }

    pub fn set_exposure(&mut self, value: f32) {
        self.params.exposure = value;
    }

    /// Write every uniform the model programs read for this frame
    ///
    /// Light-space matrices are only written for active lights, and the
    /// custom metalness/roughness only when the override is enabled. All
    /// BRDF-family values are written regardless of the active variant.
    pub fn marshal(
        &self,
        target: &mut dyn UniformTarget,
        frame: &FrameInputs,
        lights: &LightSet,
        shadow_projection: Mat4,
    ) {
        let p = &self.params;

        target.set_mat4("model", frame.model);
        target.set_mat4("view", frame.view);
        target.set_mat4("projection", frame.projection);
        target.set_vec3("cam_pos", frame.camera_position);

        for (i, light) in lights.iter().enumerate() {
            target.set_vec3(&format!("light_positions[{i}]"), light.position);
            target.set_vec3(&format!("light_colors[{i}]"), light.color);
            target.set_bool(&format!("light_active[{i}]"), light.active);
            if light.active {
                target.set_mat4(
                    &format!("light_space_matrices[{i}]"),
                    light.light_space_matrix(shadow_projection),
                );
            }
        }

        target.set_int("blinn_phong_exponent", p.blinn_phong_exponent);

        target.set_int("n_u", p.ashikhmin_shirley_nu);
        target.set_int("n_v", p.ashikhmin_shirley_nv);

        target.set_int("diffuse_term", p.diffuse_term as i32);
        target.set_int("fresnel_term", p.fresnel_term as i32);
        target.set_int("normal_distribution_term", p.normal_distribution_term as i32);
        target.set_int("geometry_term", p.geometry_term as i32);

        target.set_bool("custom_material_values_enabled", p.custom_material_values_enabled);
        if p.custom_material_values_enabled {
            target.set_float("custom_metalness", p.custom_metalness);
            target.set_float("custom_roughness", p.custom_roughness);
        }

        let d = &p.disney;
        target.set_float("subsurface", d.subsurface);
        target.set_float("metallic", d.metallic);
        target.set_float("specular", d.specular);
        target.set_float("specular_tint", d.specular_tint);
        target.set_float("roughness", d.roughness);
        target.set_float("anisotropic", d.anisotropic);
        target.set_float("sheen", d.sheen);
        target.set_float("sheen_tint", d.sheen_tint);
        target.set_float("clearcoat", d.clearcoat);
        target.set_float("clearcoat_gloss", d.clearcoat_gloss);

        target.set_bool("shadows_enabled", p.shadows_enabled);
        target.set_int("render_output", p.render_output as i32);
        target.set_int("debug_output", p.debug_output as i32);
        target.set_float("gamma", p.gamma);
        target.set_float("exposure", p.exposure);
    }
}
