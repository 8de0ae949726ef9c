//! Renderer errors

use pbr_core::AssetError;

/// Errors raised by GPU-side operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// An image or mesh could not be loaded
    #[error(transparent)]
    Asset(#[from] AssetError),
    /// A WGSL module or pipeline failed validation
    #[error("Shader '{label}' failed to compile: {message}")]
    ShaderCompile {
        /// Debug label of the failing module or pipeline
        label: String,
        /// Validation message reported by wgpu
        message: String,
    },
    /// An operation was called before the resources it needs exist
    #[error("Precondition failed: {0}")]
    Precondition(String),
    /// No suitable GPU adapter was found
    #[error("No suitable GPU adapter found")]
    AdapterNotFound,
    /// The adapter refused to create a device
    #[error("Failed to create device: {0}")]
    RequestDevice(String),
    /// A precomputation pass failed on the GPU
    #[error("Environment bake failed: {0}")]
    Bake(String),
    /// Copying a texture back to the CPU failed
    #[error("Readback failed: {0}")]
    Readback(String),
}
