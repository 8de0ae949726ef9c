//! Small emissive cubes drawn at the active light positions

use std::sync::Arc;

use glam::{Mat4, Vec3};
use pbr_core::shading::light_marker_layout;
use pbr_core::{LightSet, UniformTarget};

use crate::context::GpuContext;
use crate::error::RenderError;
use crate::geometry::GeometryBuffers;
use crate::program::{GpuProgram, PipelineConfig, uniform_bind_group_layout};
use crate::texture::DEPTH_FORMAT;
use crate::vertex::cube_vertex_layout;

/// Half-extent of a marker cube in world units
const MARKER_SCALE: f32 = 0.05;

/// Program that draws one marker per active light
pub struct LightRenderResources {
    program: GpuProgram,
}

impl LightRenderResources {
    /// Build the marker pipeline for `format` color targets
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        let layout = Arc::new(light_marker_layout());
        let uniform_layout =
            uniform_bind_group_layout(device, "Light Marker Uniform Layout", layout.size() as u64);
        let layouts = [&uniform_layout];
        let pipeline = PipelineConfig::new(
            "Light Marker",
            include_str!("../shaders/light_marker.wgsl"),
            Some(format),
            &layouts,
        )
        .with_vertex_layouts(vec![cube_vertex_layout()])
        .with_depth(DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
        .build(device)?;

        let program = GpuProgram::new(device, "Light Marker", pipeline, layout, uniform_layout, 16);
        Ok(Self { program })
    }

    /// Reset uniform slots at the start of a frame
    pub fn begin_frame(&mut self) {
        self.program.begin_frame();
    }

    /// Draw every active light
    pub fn draw(
        &mut self,
        ctx: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        geometry: &GeometryBuffers,
        lights: &LightSet,
        view: Mat4,
        projection: Mat4,
    ) {
        self.program.set_mat4("view", view);
        self.program.set_mat4("projection", projection);

        for light in lights.iter().filter(|l| l.active) {
            let model = Mat4::from_translation(light.position)
                * Mat4::from_scale(Vec3::splat(MARKER_SCALE));
            self.program.set_mat4("model", model);
            self.program.set_vec3("light_color", marker_color(light.color));
            self.program.bind(&ctx.device, &ctx.queue, pass);
            geometry.draw_cube(pass);
        }
    }
}

/// HDR light color scaled into displayable range, hue preserved
fn marker_color(color: Vec3) -> Vec3 {
    color / color.max_element().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_color_keeps_hue() {
        assert_eq!(marker_color(Vec3::new(5.0, 2.5, 0.0)), Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(marker_color(Vec3::new(0.5, 0.5, 0.5)), Vec3::splat(0.5));
        assert_eq!(marker_color(Vec3::ZERO), Vec3::ZERO);
    }
}
