//! PBR Viewer Renderer
//!
//! WGPU-based image-based lighting, self-shadowing and multi-BRDF shading.
//!
//! # Module Structure
//!
//! ```text
//! pbr-renderer/
//! ├── environment/     # IBL bake passes, environment maps, skybox
//! ├── shadows.rs       # Per-light self-shadow depth maps
//! ├── shading.rs       # Model programs, one per lighting variant
//! ├── program.rs       # Pipelines and name-keyed uniform programs
//! ├── material.rs      # Texture bind group of the model programs
//! ├── scene.rs         # Uploaded model and its texture references
//! ├── renderer/        # Frame composition and light markers
//! ├── camera.rs        # Arcball camera
//! ├── readback.rs      # GPU to CPU texture copies
//! └── config.rs        # RON configuration
//! ```

pub mod camera;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod material;
pub mod program;
pub mod readback;
pub mod renderer;
pub mod scene;
pub mod shading;
pub mod shadows;
pub mod texture;
pub mod vertex;

pub use camera::ArcballCamera;
pub use config::{ConfigError, ViewerConfig};
pub use context::GpuContext;
pub use environment::{EnvironmentMaps, EnvironmentProcessor};
pub use error::RenderError;
pub use renderer::Renderer;
pub use scene::Scene;
pub use shadows::SelfShadowGenerator;
pub use texture::GpuTexture;
