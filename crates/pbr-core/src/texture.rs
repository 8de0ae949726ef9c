//! Texture references and per-draw binding plans
//!
//! A [`TextureRef`] names a GPU texture owned elsewhere. Scenes keep lists of
//! references and, when drawing, turn them into a [`TextureBindingPlan`]:
//! every reference receives a slot name built from its kind and a per-kind
//! counter (`texture_diffuse[0]`, `texture_shadows[2]`, ...) and every kind
//! that received at least one texture gets its `*_available` flag raised.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub Uuid);

impl TextureId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TextureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic role of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureKind {
    Diffuse,
    Normal,
    Roughness,
    Emissive,
    Irradiance,
    PreFilteredEnvironment,
    BrdfLookup,
    Shadows,
    Environment,
    Equirectangular,
}

impl TextureKind {
    /// Kinds a mesh draw can bind, in binding order
    pub const BINDABLE: [TextureKind; 8] = [
        TextureKind::Diffuse,
        TextureKind::Normal,
        TextureKind::Roughness,
        TextureKind::Emissive,
        TextureKind::Irradiance,
        TextureKind::PreFilteredEnvironment,
        TextureKind::BrdfLookup,
        TextureKind::Shadows,
    ];

    /// Shader-side base name
    pub fn uniform_name(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Normal => "texture_normal",
            TextureKind::Roughness => "texture_roughness",
            TextureKind::Emissive => "texture_emissive",
            TextureKind::Irradiance => "texture_irradiance",
            TextureKind::PreFilteredEnvironment => "texture_pre_filtered_environment",
            TextureKind::BrdfLookup => "texture_brdf_lookup",
            TextureKind::Shadows => "texture_shadows",
            TextureKind::Environment => "texture_environment",
            TextureKind::Equirectangular => "texture_equirectangular",
        }
    }

    /// Name of the boolean uniform telling the shader this kind is bound
    pub fn available_flag(self) -> String {
        format!("{}_available", self.uniform_name())
    }

    /// Number of slots a mesh draw exposes for this kind
    pub fn capacity(self) -> u32 {
        match self {
            TextureKind::Shadows => crate::constants::LIGHT_COUNT as u32,
            TextureKind::Environment | TextureKind::Equirectangular => 0,
            _ => 1,
        }
    }
}

/// Borrowed association between a scene and a GPU texture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureRef {
    pub id: TextureId,
    pub kind: TextureKind,
    /// Source file, empty for generated textures
    pub path: PathBuf,
}

impl TextureRef {
    /// Reference to a texture generated on the GPU
    pub fn generated(kind: TextureKind) -> Self {
        Self {
            id: TextureId::new(),
            kind,
            path: PathBuf::new(),
        }
    }

    /// Reference to a texture decoded from `path`
    pub fn from_file(kind: TextureKind, path: impl Into<PathBuf>) -> Self {
        Self {
            id: TextureId::new(),
            kind,
            path: path.into(),
        }
    }
}

impl PartialEq for TextureRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TextureRef {}

impl std::hash::Hash for TextureRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One texture assigned to a shader slot
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub id: TextureId,
    pub kind: TextureKind,
    pub index: u32,
    /// Slot name such as `texture_shadows[1]`
    pub slot: String,
}

/// Result of numbering a mesh's texture references for one draw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureBindingPlan {
    pub bindings: Vec<TextureBinding>,
    counts: HashMap<TextureKind, u32>,
}

impl TextureBindingPlan {
    /// Number the references by kind, in list order
    pub fn build<'a>(textures: impl IntoIterator<Item = &'a TextureRef>) -> Self {
        let mut plan = Self::default();
        for texture in textures {
            let counter = plan.counts.entry(texture.kind).or_insert(0);
            let index = *counter;
            if index >= texture.kind.capacity() {
                tracing::warn!(
                    "No free {} slot for texture {}, skipped",
                    texture.kind.uniform_name(),
                    texture.id
                );
                continue;
            }
            *counter += 1;
            plan.bindings.push(TextureBinding {
                id: texture.id,
                kind: texture.kind,
                index,
                slot: format!("{}[{}]", texture.kind.uniform_name(), index),
            });
        }
        plan
    }

    /// True if at least one texture of `kind` is bound
    pub fn is_available(&self, kind: TextureKind) -> bool {
        self.counts.get(&kind).copied().unwrap_or(0) > 0
    }

    /// Binding at (`kind`, `index`)
    pub fn get(&self, kind: TextureKind, index: u32) -> Option<&TextureBinding> {
        self.bindings
            .iter()
            .find(|b| b.kind == kind && b.index == index)
    }

    /// Raise the availability flag of every bound kind on `target`
    pub fn apply_flags(&self, target: &mut dyn crate::uniform::UniformTarget) {
        for kind in TextureKind::BINDABLE {
            if self.is_available(kind) {
                target.set_bool(&kind.available_flag(), true);
            }
        }
    }

    /// Lower every availability flag on `target`
    pub fn reset_flags(target: &mut dyn crate::uniform::UniformTarget) {
        for kind in TextureKind::BINDABLE {
            target.set_bool(&kind.available_flag(), false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_id() {
        let a = TextureRef::from_file(TextureKind::Diffuse, "a.png");
        let mut b = a.clone();
        b.path = PathBuf::from("other.png");
        b.kind = TextureKind::Normal;
        assert_eq!(a, b);
        assert_ne!(a, TextureRef::from_file(TextureKind::Diffuse, "a.png"));
    }

    #[test]
    fn test_plan_numbers_per_kind() {
        let textures = vec![
            TextureRef::generated(TextureKind::Shadows),
            TextureRef::from_file(TextureKind::Diffuse, "d.png"),
            TextureRef::generated(TextureKind::Shadows),
            TextureRef::generated(TextureKind::Irradiance),
            TextureRef::generated(TextureKind::Shadows),
        ];
        let plan = TextureBindingPlan::build(&textures);
        let slots: Vec<&str> = plan.bindings.iter().map(|b| b.slot.as_str()).collect();
        assert_eq!(
            slots,
            vec![
                "texture_shadows[0]",
                "texture_diffuse[0]",
                "texture_shadows[1]",
                "texture_irradiance[0]",
                "texture_shadows[2]",
            ]
        );
        assert!(plan.is_available(TextureKind::Diffuse));
        assert!(!plan.is_available(TextureKind::Normal));
        assert_eq!(plan.get(TextureKind::Shadows, 2).map(|b| b.id), Some(textures[4].id));
    }

    #[test]
    fn test_plan_skips_overflow() {
        let textures = vec![
            TextureRef::from_file(TextureKind::Diffuse, "a.png"),
            TextureRef::from_file(TextureKind::Diffuse, "b.png"),
            TextureRef::generated(TextureKind::Environment),
        ];
        let plan = TextureBindingPlan::build(&textures);
        assert_eq!(plan.bindings.len(), 1);
        assert_eq!(plan.bindings[0].id, textures[0].id);
    }

    #[test]
    fn test_available_flag_names() {
        assert_eq!(
            TextureKind::BrdfLookup.available_flag(),
            "texture_brdf_lookup_available"
        );
    }
}
