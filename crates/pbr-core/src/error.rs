//! Asset loading errors

/// Errors raised while reading images or meshes from disk
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Failed to decode image at {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty mesh: no geometry found")]
    EmptyMesh,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
