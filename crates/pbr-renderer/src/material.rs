//! Texture bind group of the model programs (group 1)
//!
//! Every [`TextureKind::BINDABLE`] slot has a fixed binding. Slots the
//! binding plan leaves empty are filled with a fallback so the bind group is
//! always complete; the matching `texture_*_available` flag stays false.

use std::collections::HashMap;

use pbr_core::{TextureBindingPlan, TextureId, TextureKind};

use crate::texture::{FallbackTextures, GpuTexture, Samplers};

/// Binding of the first shadow map; the others follow consecutively
pub const SHADOW_BINDING_BASE: u32 = 9;

/// Binding index of (`kind`, `index`), `None` for non-bindable kinds
pub fn texture_binding(kind: TextureKind, index: u32) -> Option<u32> {
    match kind {
        TextureKind::Diffuse => Some(1),
        TextureKind::Normal => Some(2),
        TextureKind::Roughness => Some(3),
        TextureKind::Emissive => Some(4),
        TextureKind::Irradiance => Some(5),
        TextureKind::PreFilteredEnvironment => Some(6),
        TextureKind::BrdfLookup => Some(7),
        TextureKind::Shadows if index < kind.capacity() => Some(SHADOW_BINDING_BASE + index),
        _ => None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

/// Layout shared by every model program
pub fn material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    use wgpu::TextureViewDimension::{Cube, D2};

    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        texture_entry(1, D2),
        texture_entry(2, D2),
        texture_entry(3, D2),
        texture_entry(4, D2),
        texture_entry(5, Cube),
        texture_entry(6, Cube),
        texture_entry(7, D2),
        wgpu::BindGroupLayoutEntry {
            binding: 8,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
            count: None,
        },
    ];
    for i in 0..TextureKind::Shadows.capacity() {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: SHADOW_BINDING_BASE + i,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: D2,
                sample_type: wgpu::TextureSampleType::Depth,
            },
            count: None,
        });
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material Bind Group Layout"),
        entries: &entries,
    })
}

/// Views of every texture a draw may reference, keyed by handle
///
/// Collected per frame from the components that own the textures.
#[derive(Default)]
pub struct TextureViews<'a> {
    views: HashMap<TextureId, &'a wgpu::TextureView>,
}

impl<'a> TextureViews<'a> {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one texture
    pub fn insert(&mut self, texture: &'a GpuTexture) {
        self.views.insert(texture.id(), &texture.view);
    }

    /// Register several textures
    pub fn extend(&mut self, textures: impl IntoIterator<Item = &'a GpuTexture>) {
        for texture in textures {
            self.insert(texture);
        }
    }

    /// View for `id`
    pub fn get(&self, id: TextureId) -> Option<&'a wgpu::TextureView> {
        self.views.get(&id).copied()
    }
}

/// Everything needed to assemble material bind groups
pub struct MaterialResources<'a> {
    /// Group 1 layout
    pub layout: &'a wgpu::BindGroupLayout,
    /// Shared samplers
    pub samplers: &'a Samplers,
    /// Stand-ins for empty slots
    pub fallbacks: &'a FallbackTextures,
    /// Views of the referenced textures
    pub views: &'a TextureViews<'a>,
}

impl MaterialResources<'_> {
    fn fallback(&self, binding: u32) -> &wgpu::TextureView {
        match binding {
            5 | 6 => &self.fallbacks.black_cube,
            b if b >= SHADOW_BINDING_BASE => &self.fallbacks.depth,
            _ => &self.fallbacks.white,
        }
    }

    /// Bind group holding the textures named by `plan`
    pub fn create_bind_group(&self, device: &wgpu::Device, plan: &TextureBindingPlan) -> wgpu::BindGroup {
        let shadow_slots = TextureKind::Shadows.capacity();
        let texture_bindings: Vec<u32> = (1..=7)
            .chain(SHADOW_BINDING_BASE..SHADOW_BINDING_BASE + shadow_slots)
            .collect();

        let mut bound: HashMap<u32, &wgpu::TextureView> = HashMap::new();
        for binding in &plan.bindings {
            let Some(slot) = texture_binding(binding.kind, binding.index) else {
                continue;
            };
            match self.views.get(binding.id) {
                Some(view) => {
                    bound.insert(slot, view);
                }
                None => tracing::warn!("Texture {} for {} is not resident", binding.id, binding.slot),
            }
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(&self.samplers.linear),
            },
            wgpu::BindGroupEntry {
                binding: 8,
                resource: wgpu::BindingResource::Sampler(&self.samplers.shadow),
            },
        ];
        for binding in texture_bindings {
            let view = bound.get(&binding).copied().unwrap_or_else(|| self.fallback(binding));
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: self.layout,
            entries: &entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_bindings_are_distinct() {
        let mut seen = Vec::new();
        for kind in TextureKind::BINDABLE {
            for index in 0..kind.capacity() {
                let binding = texture_binding(kind, index).expect("bindable");
                assert!(!seen.contains(&binding), "{kind:?}[{index}] reuses {binding}");
                seen.push(binding);
            }
        }
        assert_eq!(seen.len(), 11);
    }

    #[test]
    fn test_non_bindable_kinds() {
        assert_eq!(texture_binding(TextureKind::Environment, 0), None);
        assert_eq!(texture_binding(TextureKind::Equirectangular, 0), None);
        assert_eq!(texture_binding(TextureKind::Shadows, 4), None);
        assert_eq!(texture_binding(TextureKind::Shadows, 3), Some(12));
    }
}
