//! Drawable model with its texture references and model transform

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use pbr_core::{ModelData, TextureBindingPlan, TextureId, TextureRef};

use crate::context::GpuContext;
use crate::material::MaterialResources;
use crate::program::GpuProgram;
use crate::texture::{GpuTexture, load_material_texture};

/// One uploaded sub-mesh and the material textures it owns
pub struct GpuMesh {
    /// Object name from the model file
    pub name: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    textures: Vec<GpuTexture>,
}

impl GpuMesh {
    fn references(&self) -> impl Iterator<Item = &TextureRef> {
        self.textures.iter().map(GpuTexture::reference)
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// The loaded model plus the textures other components lend to it
///
/// Scene-level references (environment maps, shadow maps) are shared by
/// every mesh and never owned: the scene holds only their handles.
pub struct Scene {
    path: Option<PathBuf>,
    meshes: Vec<GpuMesh>,
    references: Vec<TextureRef>,
    model: Mat4,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene with an identity transform
    pub fn new() -> Self {
        Self {
            path: None,
            meshes: Vec::new(),
            references: Vec::new(),
            model: Mat4::IDENTITY,
        }
    }

    /// Upload every mesh of `model` and decode its material textures
    ///
    /// A material texture that fails to load is skipped with a warning; the
    /// mesh then renders with that slot's availability flag lowered.
    pub fn from_model(ctx: &GpuContext, model: &ModelData) -> Self {
        let mut scene = Self::new();
        scene.path = Some(model.path.clone());

        for mesh in &model.meshes {
            let vertex_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            let mut textures = Vec::new();
            for reference in &mesh.textures {
                match load_material_texture(&ctx.device, &ctx.queue, reference) {
                    Ok(texture) => textures.push(texture),
                    Err(e) => tracing::warn!("Mesh '{}': {}", mesh.name, e),
                }
            }

            scene.meshes.push(GpuMesh {
                name: mesh.name.clone(),
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                textures,
            });
        }

        tracing::info!(
            "Scene holds {} meshes ({} triangles)",
            scene.meshes.len(),
            model.triangle_count()
        );
        scene
    }

    /// Model file this scene was built from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Uploaded meshes
    pub fn meshes(&self) -> &[GpuMesh] {
        &self.meshes
    }

    /// Material textures owned by the meshes
    pub fn textures(&self) -> impl Iterator<Item = &GpuTexture> {
        self.meshes.iter().flat_map(|m| m.textures.iter())
    }

    /// Attach a texture to every mesh; a handle already present is ignored
    pub fn add_texture_reference(&mut self, reference: TextureRef) {
        if self.references.iter().any(|r| r.id == reference.id) {
            tracing::debug!("Texture {} already attached", reference.id);
            return;
        }
        self.references.push(reference);
    }

    /// Detach the texture with `id`, returning whether it was attached
    pub fn remove_texture_reference(&mut self, id: TextureId) -> bool {
        let before = self.references.len();
        self.references.retain(|r| r.id != id);
        before != self.references.len()
    }

    /// Scene-level references in attachment order
    pub fn texture_references(&self) -> &[TextureRef] {
        &self.references
    }

    /// Current model matrix
    pub fn model_transform(&self) -> Mat4 {
        self.model
    }

    /// Replace the model matrix
    pub fn set_model_transform(&mut self, model: Mat4) {
        self.model = model;
    }

    /// Rotate the model about `axis` by `angle` radians
    pub fn rotate(&mut self, axis: Vec3, angle: f32) {
        let Some(axis) = axis.try_normalize() else {
            tracing::warn!("Ignoring rotation about a zero axis");
            return;
        };
        self.model = Mat4::from_axis_angle(axis, angle) * self.model;
    }

    /// Scale the model uniformly
    pub fn scale(&mut self, factor: f32) {
        self.model = Mat4::from_scale(Vec3::splat(factor)) * self.model;
    }

    /// Binding plan of one mesh: its own textures first, then the shared ones
    pub fn binding_plan(&self, mesh: &GpuMesh) -> TextureBindingPlan {
        TextureBindingPlan::build(mesh.references().chain(self.references.iter()))
    }

    /// Draw every mesh with `program`
    ///
    /// The program's uniforms must already hold the frame values; only the
    /// texture availability flags are written here, then lowered again.
    pub fn draw(
        &self,
        ctx: &GpuContext,
        program: &mut GpuProgram,
        pass: &mut wgpu::RenderPass<'_>,
        resources: &MaterialResources<'_>,
    ) {
        for mesh in &self.meshes {
            let plan = self.binding_plan(mesh);
            plan.apply_flags(program);
            program.bind(&ctx.device, &ctx.queue, pass);

            let bind_group = resources.create_bind_group(&ctx.device, &plan);
            pass.set_bind_group(1, &bind_group, &[]);
            mesh.draw(pass);

            TextureBindingPlan::reset_flags(program);
        }
    }

    /// Draw geometry only, with whatever depth program the caller bound
    pub fn draw_depth(&self, pass: &mut wgpu::RenderPass<'_>) {
        for mesh in &self.meshes {
            mesh.draw(pass);
        }
    }

    /// Release the material textures
    pub fn destroy(self) {
        for mesh in self.meshes {
            for texture in mesh.textures {
                texture.destroy();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pbr_core::TextureKind;

    #[test]
    fn test_duplicate_references_are_ignored() {
        let mut scene = Scene::new();
        let irradiance = TextureRef::generated(TextureKind::Irradiance);
        scene.add_texture_reference(irradiance.clone());
        scene.add_texture_reference(irradiance.clone());
        assert_eq!(scene.texture_references().len(), 1);

        assert!(scene.remove_texture_reference(irradiance.id));
        assert!(!scene.remove_texture_reference(irradiance.id));
        assert!(scene.texture_references().is_empty());
    }

    #[test]
    fn test_references_keep_attachment_order() {
        let mut scene = Scene::new();
        let shadows: Vec<_> = (0..3)
            .map(|_| TextureRef::generated(TextureKind::Shadows))
            .collect();
        for shadow in &shadows {
            scene.add_texture_reference(shadow.clone());
        }
        let plan = TextureBindingPlan::build(scene.texture_references());
        for (i, shadow) in shadows.iter().enumerate() {
            let binding = plan.get(TextureKind::Shadows, i as u32).expect("bound");
            assert_eq!(binding.id, shadow.id);
        }
    }

    #[test]
    fn test_transform_helpers() {
        let mut scene = Scene::new();
        assert_eq!(scene.model_transform(), Mat4::IDENTITY);

        scene.rotate(Vec3::Y, std::f32::consts::FRAC_PI_2);
        let p = scene.model_transform().transform_point3(Vec3::X);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-6);

        scene.set_model_transform(Mat4::IDENTITY);
        scene.scale(2.0);
        let p = scene.model_transform().transform_point3(Vec3::ONE);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-6);

        scene.rotate(Vec3::ZERO, 1.0);
        assert_eq!(scene.model_transform(), Mat4::from_scale(Vec3::splat(2.0)));
    }
}
