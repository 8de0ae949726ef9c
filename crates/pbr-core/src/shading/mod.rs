//! Shading model selection and parameterization
//!
//! The enumerations here are forwarded to shaders as integers, so every
//! variant carries an explicit discriminant.

mod dispatcher;
mod layout;
mod parameters;

pub use dispatcher::{FrameInputs, ShadingDispatcher};
pub use layout::{light_marker_layout, shading_layout, shadow_layout, skybox_layout};
pub use parameters::{DisneyParameters, ShadingParameters};

use serde::{Deserialize, Serialize};

/// The analytic lighting model used for the model draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum LightingVariant {
    NoLighting = 0,
    BlinnPhong = 1,
    #[default]
    CookTorrance = 2,
    OrenNayar = 3,
    AshikhminShirley = 4,
    Debug = 5,
    Disney = 6,
}

impl LightingVariant {
    /// All variants in discriminant order
    pub const ALL: [LightingVariant; 7] = [
        LightingVariant::NoLighting,
        LightingVariant::BlinnPhong,
        LightingVariant::CookTorrance,
        LightingVariant::OrenNayar,
        LightingVariant::AshikhminShirley,
        LightingVariant::Debug,
        LightingVariant::Disney,
    ];

    /// Program that renders this variant
    pub fn program(self) -> ProgramKind {
        match self {
            LightingVariant::NoLighting => ProgramKind::Unlit,
            LightingVariant::BlinnPhong => ProgramKind::BlinnPhong,
            LightingVariant::CookTorrance => ProgramKind::CookTorrance,
            LightingVariant::OrenNayar => ProgramKind::OrenNayar,
            LightingVariant::AshikhminShirley => ProgramKind::AshikhminShirley,
            LightingVariant::Debug => ProgramKind::Debug,
            LightingVariant::Disney => ProgramKind::Disney,
        }
    }
}

/// Fragment program used for the model draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Unlit,
    BlinnPhong,
    CookTorrance,
    OrenNayar,
    AshikhminShirley,
    Debug,
    Disney,
}

impl ProgramKind {
    /// Every model program
    pub const ALL: [ProgramKind; 7] = [
        ProgramKind::Unlit,
        ProgramKind::BlinnPhong,
        ProgramKind::CookTorrance,
        ProgramKind::OrenNayar,
        ProgramKind::AshikhminShirley,
        ProgramKind::Debug,
        ProgramKind::Disney,
    ];

    /// Debug label
    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Unlit => "unlit",
            ProgramKind::BlinnPhong => "blinn_phong",
            ProgramKind::CookTorrance => "cook_torrance",
            ProgramKind::OrenNayar => "oren_nayar",
            ProgramKind::AshikhminShirley => "ashikhmin_shirley",
            ProgramKind::Debug => "debug",
            ProgramKind::Disney => "disney",
        }
    }
}

/// Cook-Torrance diffuse term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum DiffuseTerm {
    NoDiffuseTerm = 0,
    Lambertian = 1,
    LambertianEnergyConserving = 2,
    #[default]
    Burley = 3,
    ShirleyEtAl = 4,
    AshikhminShirley = 5,
}

/// Cook-Torrance fresnel term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum FresnelTerm {
    NormalIncidence = 0,
    #[default]
    Schlick = 1,
}

/// Cook-Torrance normal distribution function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum NormalDistributionTerm {
    ConstantValue = 0,
    #[default]
    TrowbridgeReitzGgx = 1,
    Beckmann = 2,
    BlinnPhong = 3,
}

/// Cook-Torrance geometric shadowing term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum GeometryTerm {
    ConstantTerm = 0,
    NoGModel = 1,
    #[default]
    SeparableSchlickGgx = 2,
    SeparableSmithGgx = 3,
    SeparableSmithBeckmann = 4,
    SmithHeightCorrelatedGgx = 5,
    HeitzSmithHeightDirectionCorrelatedGgx = 6,
}

/// Quantity written by the fragment shader instead of the shaded color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum RenderOutput {
    Albedo = 0,
    AmbientOcclusion = 1,
    BrdfLookup = 2,
    #[default]
    Color = 3,
    Emissive = 4,
    Metallic = 5,
    Roughness = 6,
}

/// Visualization selected while the Debug variant is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum DebugOutput {
    #[default]
    NegativeNDotL = 0,
    NegativeNDotV = 1,
    NormalVectors = 2,
    TangentVectors = 3,
    BitangentVectors = 4,
    WwftGgx = 5,
}

/// Which environment-derived cubemap the skybox shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum SkyboxTexture {
    #[default]
    Environment = 0,
    Irradiance = 1,
    PreFilteredEnvironment = 2,
}
