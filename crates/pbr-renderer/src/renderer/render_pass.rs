//! Render pass execution.
//!
//! The main pass draws the model with the program the dispatcher selects,
//! then the light markers, then the skybox so it only fills empty pixels.

use pbr_core::{FrameInputs, LightSet, ShadingDispatcher};

use crate::context::GpuContext;
use crate::environment::{EnvironmentMaps, EnvironmentProcessor, SkyboxFrame};
use crate::geometry::GeometryBuffers;
use crate::material::MaterialResources;
use crate::scene::Scene;
use crate::shading::ShadingPrograms;

use super::LightRenderResources;

/// Main pass inputs.
pub struct MainPassParams<'a> {
    /// Device and queue.
    pub ctx: &'a GpuContext,
    /// Shared cube and quad buffers.
    pub geometry: &'a GeometryBuffers,
    /// Scene to draw.
    pub scene: &'a Scene,
    /// Lights of the session.
    pub lights: &'a LightSet,
    /// Active lighting variant and its parameters.
    pub dispatcher: &'a ShadingDispatcher,
    /// Camera and model matrices.
    pub frame: FrameInputs,
    /// Projection shared by the shadow maps.
    pub shadow_projection: glam::Mat4,
    /// Material bind group inputs.
    pub resources: &'a MaterialResources<'a>,
    /// Baked environment, if one is loaded.
    pub environment_maps: Option<&'a EnvironmentMaps>,
    /// Color target.
    pub color_view: &'a wgpu::TextureView,
    /// Depth target.
    pub depth_view: &'a wgpu::TextureView,
    /// Clear color.
    pub clear_color: wgpu::Color,
}

/// Programs the main pass writes uniforms to.
pub struct MainPassPrograms<'a> {
    /// Model programs.
    pub shading: &'a mut ShadingPrograms,
    /// Light marker program.
    pub markers: &'a mut LightRenderResources,
    /// Owner of the skybox program.
    pub environment: &'a mut EnvironmentProcessor,
}

/// Execute the main render pass.
pub fn render_main_pass(
    encoder: &mut wgpu::CommandEncoder,
    params: &MainPassParams<'_>,
    programs: MainPassPrograms<'_>,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Main Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: params.color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(params.clear_color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: params.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    // Render model
    let kind = params.dispatcher.current_program();
    match programs.shading.program_mut(kind) {
        Some(program) => {
            params
                .dispatcher
                .marshal(program, &params.frame, params.lights, params.shadow_projection);
            params
                .scene
                .draw(params.ctx, program, &mut render_pass, params.resources);
        }
        None => tracing::error!("No program compiled for {:?}", kind),
    }

    // Render light markers
    programs.markers.draw(
        params.ctx,
        &mut render_pass,
        params.geometry,
        params.lights,
        params.frame.view,
        params.frame.projection,
    );

    // Render skybox last, behind everything
    if let Some(maps) = params.environment_maps {
        let shading = params.dispatcher.parameters();
        programs.environment.draw_skybox(
            params.ctx,
            &mut render_pass,
            params.geometry,
            maps,
            &SkyboxFrame {
                view: params.frame.view,
                projection: params.frame.projection,
                gamma: shading.gamma,
                exposure: shading.exposure,
            },
        );
    }
}
