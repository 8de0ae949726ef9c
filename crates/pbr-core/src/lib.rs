//! PBR viewer core
//!
//! CPU-side model of the viewer: cube capture cameras and geometry, point
//! lights, shading parameters and the lighting variant dispatcher, the
//! name-keyed uniform interface, texture references, shadow projection, CPU
//! reference math for the IBL integrals, and OBJ import.

pub mod capture;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod ibl;
pub mod light;
pub mod mesh;
pub mod shading;
pub mod shadow;
pub mod texture;
pub mod uniform;

pub use capture::{CubeFace, capture_projection, capture_views};
pub use error::AssetError;
pub use light::{LightSet, PointLight};
pub use mesh::{MeshData, ModelData, Vertex, load_obj};
pub use shading::{
    DebugOutput, DiffuseTerm, FrameInputs, FresnelTerm, GeometryTerm, LightingVariant,
    NormalDistributionTerm, ProgramKind, RenderOutput, ShadingDispatcher, ShadingParameters,
    SkyboxTexture,
};
pub use shadow::ShadowProjection;
pub use texture::{TextureBindingPlan, TextureId, TextureKind, TextureRef};
pub use uniform::{UniformBlock, UniformLayout, UniformTarget, UniformType, UniformValue};
