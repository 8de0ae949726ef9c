//! Per-light self-shadow depth maps
//!
//! Each light slot owns one depth texture. Every frame, active lights render
//! the scene depth-only from their position toward the origin; inactive
//! slots are cleared to the far plane so they never hold stale depth.

use std::sync::Arc;

use glam::Mat4;
use pbr_core::shading::shadow_layout;
use pbr_core::{LightSet, PointLight, ShadowProjection, TextureKind, TextureRef, UniformTarget};

use crate::config::ShadowConfig;
use crate::context::GpuContext;
use crate::error::RenderError;
use crate::program::{GpuProgram, PipelineConfig, uniform_bind_group_layout};
use crate::scene::Scene;
use crate::texture::{DEPTH_FORMAT, GpuTexture};
use crate::vertex::shadow_vertex_layout;

/// Renders and owns the shadow maps of every light slot
pub struct SelfShadowGenerator {
    program: GpuProgram,
    projection: ShadowProjection,
    textures: Vec<GpuTexture>,
}

impl SelfShadowGenerator {
    /// Build the depth-only program; no textures are allocated yet
    pub fn new(device: &wgpu::Device, config: &ShadowConfig) -> Result<Self, RenderError> {
        let layout = Arc::new(shadow_layout());
        let uniform_layout =
            uniform_bind_group_layout(device, "Shadow Uniform Layout", layout.size() as u64);
        let layouts = [&uniform_layout];
        // Culling front faces keeps acne off surfaces facing the light
        let pipeline = PipelineConfig::new(
            "Self Shadow",
            include_str!("shaders/self_shadow.wgsl"),
            None,
            &layouts,
        )
        .with_vertex_layouts(vec![shadow_vertex_layout()])
        .with_cull_mode(Some(wgpu::Face::Front))
        .with_depth(DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
        .build(device)?;

        let program = GpuProgram::new(device, "Self Shadow", pipeline, layout, uniform_layout, 64);
        Ok(Self {
            program,
            projection: ShadowProjection {
                width: config.map_size,
                height: config.map_size,
                near: config.near,
                far: config.far,
            },
            textures: Vec::new(),
        })
    }

    /// Allocate `light_count` depth maps of `width` x `height`
    ///
    /// Replaces and destroys any previous set; callers must detach the old
    /// references from their scene first.
    pub fn create_self_shadowing_textures(
        &mut self,
        device: &wgpu::Device,
        light_count: usize,
        width: u32,
        height: u32,
    ) -> &[GpuTexture] {
        self.release_textures();
        self.projection.width = width;
        self.projection.height = height;

        let limit = device.limits().max_texture_dimension_2d;
        let size = wgpu::Extent3d {
            width: width.clamp(1, limit),
            height: height.clamp(1, limit),
            depth_or_array_layers: 1,
        };
        for slot in 0..light_count {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("Shadow Map {slot}")),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.textures
                .push(GpuTexture::new(TextureKind::Shadows, texture, view));
        }

        tracing::info!(
            "Allocated {} shadow maps ({}x{})",
            light_count,
            size.width,
            size.height
        );
        &self.textures
    }

    /// Width the shadow projection was configured for
    pub fn texture_width(&self) -> u32 {
        self.projection.width
    }

    /// Height the shadow projection was configured for
    pub fn texture_height(&self) -> u32 {
        self.projection.height
    }

    /// Shadow maps in light-slot order
    pub fn textures(&self) -> &[GpuTexture] {
        &self.textures
    }

    /// References to attach to the scene, in light-slot order
    pub fn references(&self) -> Vec<TextureRef> {
        self.textures.iter().map(|t| t.reference().clone()).collect()
    }

    /// Perspective shared by every light
    pub fn shadow_projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// World to shadow-clip transform of `light`
    pub fn light_space_matrix(&self, light: &PointLight) -> Mat4 {
        light.light_space_matrix(self.shadow_projection_matrix())
    }

    /// Record one depth pass per light slot
    pub fn calculate_self_shadowing(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        lights: &LightSet,
    ) -> Result<(), RenderError> {
        if self.textures.is_empty() {
            let err = RenderError::Precondition(
                "shadow maps must be allocated before calculating self-shadowing".to_string(),
            );
            tracing::error!("{}", err);
            return Err(err);
        }

        self.program.begin_frame();
        let model = scene.model_transform();
        let projection = self.shadow_projection_matrix();

        for (slot, texture) in self.textures.iter().enumerate() {
            let light = lights.get(slot).filter(|l| l.active);

            // The pass owns viewport and cull state, nothing leaks to later passes
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Self Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let Some(light) = light else {
                continue;
            };
            pass.set_viewport(
                0.0,
                0.0,
                texture.width() as f32,
                texture.height() as f32,
                0.0,
                1.0,
            );
            self.program
                .set_mat4("light_space_matrix", light.light_space_matrix(projection));
            self.program.set_mat4("model", model);
            self.program.bind(&ctx.device, &ctx.queue, &mut pass);
            scene.draw_depth(&mut pass);
        }
        Ok(())
    }

    /// Destroy every shadow map; calculating shadows then fails until reallocation
    pub fn release_textures(&mut self) {
        if !self.textures.is_empty() {
            tracing::debug!("Releasing {} shadow maps", self.textures.len());
        }
        for texture in self.textures.drain(..) {
            texture.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::readback::read_texture_rgba_f32;
    use approx::assert_relative_eq;
    use glam::Vec3;
    use pbr_core::{MeshData, ModelData, Vertex};

    fn quad_model() -> ModelData {
        // A square in the z = 0 plane facing +Z and one facing -Z
        let corners = [[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]];
        let vertices = corners
            .iter()
            .map(|[x, y]| Vertex {
                position: [*x, *y, 0.0],
                normal: [0.0, 0.0, 1.0],
                uv: [0.0, 0.0],
                tangent: [1.0, 0.0, 0.0],
                bitangent: [0.0, 1.0, 0.0],
            })
            .collect();
        ModelData {
            path: "quad.obj".into(),
            meshes: vec![MeshData {
                name: "quad".to_string(),
                vertices,
                indices: vec![0, 1, 2, 0, 2, 3, 0, 2, 1, 0, 3, 2],
                textures: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_projection_uses_map_aspect() {
        let Some(ctx) = test_context() else { return };
        let mut generator =
            SelfShadowGenerator::new(&ctx.device, &ShadowConfig::default()).expect("generator");
        generator.create_self_shadowing_textures(&ctx.device, 4, 128, 64);
        assert_eq!(generator.textures().len(), 4);
        assert_eq!(generator.texture_width(), 128);
        assert_eq!(generator.texture_height(), 64);
        let m = generator.shadow_projection_matrix();
        assert_relative_eq!(m.y_axis.y / m.x_axis.x, 2.0, epsilon = 1e-5);

        let light = PointLight::new(Vec3::new(0.0, 0.0, 1.0));
        let clip = generator.light_space_matrix(&light) * Vec3::ZERO.extend(1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-6);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_calculate_before_allocation_is_rejected() {
        let Some(ctx) = test_context() else { return };
        let mut generator =
            SelfShadowGenerator::new(&ctx.device, &ShadowConfig::default()).expect("generator");
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let result =
            generator.calculate_self_shadowing(&ctx, &mut encoder, &Scene::new(), &LightSet::new());
        assert!(matches!(result, Err(RenderError::Precondition(_))));
    }

    #[test]
    fn test_inactive_light_leaves_cleared_map() {
        let Some(ctx) = test_context() else { return };
        let scene = Scene::from_model(&ctx, &quad_model());
        let mut lights = LightSet::new();
        for slot in 0..4 {
            lights.set_position(slot, Vec3::new(0.2 * slot as f32 - 0.3, 0.1, 1.0));
            lights.set_active(slot, slot != 2);
        }

        let mut generator =
            SelfShadowGenerator::new(&ctx.device, &ShadowConfig::default()).expect("generator");
        generator.create_self_shadowing_textures(&ctx.device, 4, 64, 64);
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        generator
            .calculate_self_shadowing(&ctx, &mut encoder, &scene, &lights)
            .expect("shadow passes");
        ctx.queue.submit(Some(encoder.finish()));

        for (slot, texture) in generator.textures().iter().enumerate() {
            let depths = read_texture_rgba_f32(&ctx, &texture.texture, 0, 0).expect("readback");
            let written = depths.iter().filter(|d| d[0] < 1.0).count();
            if slot == 2 {
                assert_eq!(written, 0, "inactive slot {slot} was rendered");
            } else {
                assert!(written > 0, "active slot {slot} has no depth");
            }
        }
        generator.release_textures();
        assert!(generator.textures().is_empty());
    }
}
