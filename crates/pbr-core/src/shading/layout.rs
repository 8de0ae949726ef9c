//! Uniform layouts of the viewer's programs
//!
//! Field order here must match the WGSL struct declarations.

use crate::constants::LIGHT_COUNT;
use crate::texture::TextureKind;
use crate::uniform::{UniformLayout, UniformType};

/// Layout of the `ShadingUniforms` struct shared by every model program
pub fn shading_layout() -> UniformLayout {
    let lights = LIGHT_COUNT as u32;
    let mut builder = UniformLayout::builder()
        .field("model", UniformType::Mat4)
        .field("view", UniformType::Mat4)
        .field("projection", UniformType::Mat4)
        .array("light_space_matrices", UniformType::Mat4, lights)
        .array("light_positions", UniformType::Vec3, lights)
        .array("light_colors", UniformType::Vec3, lights)
        .packed("light_active", UniformType::Bool, lights)
        .field("cam_pos", UniformType::Vec3)
        .field("blinn_phong_exponent", UniformType::Int)
        .field("n_u", UniformType::Int)
        .field("n_v", UniformType::Int)
        .field("diffuse_term", UniformType::Int)
        .field("fresnel_term", UniformType::Int)
        .field("normal_distribution_term", UniformType::Int)
        .field("geometry_term", UniformType::Int)
        .field("custom_material_values_enabled", UniformType::Bool)
        .field("custom_metalness", UniformType::Float)
        .field("custom_roughness", UniformType::Float)
        .field("subsurface", UniformType::Float)
        .field("metallic", UniformType::Float)
        .field("specular", UniformType::Float)
        .field("specular_tint", UniformType::Float)
        .field("roughness", UniformType::Float)
        .field("anisotropic", UniformType::Float)
        .field("sheen", UniformType::Float)
        .field("sheen_tint", UniformType::Float)
        .field("clearcoat", UniformType::Float)
        .field("clearcoat_gloss", UniformType::Float)
        .field("shadows_enabled", UniformType::Bool)
        .field("render_output", UniformType::Int)
        .field("debug_output", UniformType::Int)
        .field("gamma", UniformType::Float)
        .field("exposure", UniformType::Float);
    for kind in TextureKind::BINDABLE {
        builder = builder.field(&kind.available_flag(), UniformType::Bool);
    }
    builder.build()
}

/// Layout of the depth-only shadow program
pub fn shadow_layout() -> UniformLayout {
    UniformLayout::builder()
        .field("light_space_matrix", UniformType::Mat4)
        .field("model", UniformType::Mat4)
        .build()
}

/// Layout of the skybox program
pub fn skybox_layout() -> UniformLayout {
    UniformLayout::builder()
        .field("view", UniformType::Mat4)
        .field("projection", UniformType::Mat4)
        .field("gamma", UniformType::Float)
        .field("exposure", UniformType::Float)
        .field("mip_level", UniformType::Float)
        .build()
}

/// Layout of the light marker program
pub fn light_marker_layout() -> UniformLayout {
    UniformLayout::builder()
        .field("model", UniformType::Mat4)
        .field("view", UniformType::Mat4)
        .field("projection", UniformType::Mat4)
        .field("light_color", UniformType::Vec3)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shading_layout_matches_wgsl_struct() {
        let layout = shading_layout();
        let offset = |name: &str| layout.slot(name).map(|s| s.offset);
        assert_eq!(offset("projection"), Some(128));
        assert_eq!(offset("light_space_matrices[0]"), Some(192));
        assert_eq!(offset("light_space_matrices[3]"), Some(384));
        assert_eq!(offset("light_positions[0]"), Some(448));
        assert_eq!(offset("light_colors[1]"), Some(528));
        assert_eq!(offset("light_active[2]"), Some(584));
        assert_eq!(offset("cam_pos"), Some(592));
        assert_eq!(offset("blinn_phong_exponent"), Some(604));
        assert_eq!(offset("roughness"), Some(660));
        assert_eq!(offset("exposure"), Some(700));
        assert_eq!(offset("texture_diffuse_available"), Some(704));
        assert_eq!(offset("texture_shadows_available"), Some(732));
        assert_eq!(layout.size(), 736);
    }

    #[test]
    fn test_small_layouts() {
        assert_eq!(shadow_layout().size(), 128);
        assert_eq!(skybox_layout().size(), 144);
        assert_eq!(light_marker_layout().size(), 208);
    }
}
