//! Skybox drawn from one of the environment cubemaps

use std::sync::Arc;

use glam::{Mat3, Mat4};
use pbr_core::UniformTarget;
use pbr_core::shading::skybox_layout;

use crate::error::RenderError;
use crate::geometry::GeometryBuffers;
use crate::program::{GpuProgram, PipelineConfig, uniform_bind_group_layout};
use crate::texture::{DEPTH_FORMAT, GpuTexture};
use crate::vertex::cube_vertex_layout;

/// Per-frame inputs of the skybox pass
pub struct SkyboxFrame {
    /// Camera view matrix; its translation is ignored
    pub view: Mat4,
    /// Camera projection
    pub projection: Mat4,
    /// Display gamma
    pub gamma: f32,
    /// Exposure applied before tone mapping
    pub exposure: f32,
}

/// Program and layouts of the skybox pass
pub struct SkyboxRenderer {
    program: GpuProgram,
    texture_layout: wgpu::BindGroupLayout,
}

impl SkyboxRenderer {
    /// Build the skybox pipeline for `format` color targets
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        let layout = Arc::new(skybox_layout());
        let uniform_layout =
            uniform_bind_group_layout(device, "Skybox Uniform Layout", layout.size() as u64);
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layouts = [&uniform_layout, &texture_layout];
        // The sky sits at depth 1.0, so it only fills pixels nothing else covered
        let pipeline = PipelineConfig::new(
            "Skybox",
            include_str!("../shaders/skybox.wgsl"),
            Some(format),
            &layouts,
        )
        .with_vertex_layouts(vec![cube_vertex_layout()])
        .with_depth(DEPTH_FORMAT, false, wgpu::CompareFunction::LessEqual)
        .build(device)?;

        let program = GpuProgram::new(device, "Skybox", pipeline, layout, uniform_layout, 16);
        Ok(Self {
            program,
            texture_layout,
        })
    }

    /// Reset the uniform ring at the start of a frame
    pub fn begin_frame(&mut self) {
        self.program.begin_frame();
    }

    /// Record the skybox draw
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pass: &mut wgpu::RenderPass<'_>,
        geometry: &GeometryBuffers,
        texture: &GpuTexture,
        mip_level: f32,
        sampler: &wgpu::Sampler,
        frame: &SkyboxFrame,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.program
            .set_mat4("view", Mat4::from_mat3(Mat3::from_mat4(frame.view)));
        self.program.set_mat4("projection", frame.projection);
        self.program.set_float("gamma", frame.gamma);
        self.program.set_float("exposure", frame.exposure);
        self.program.set_float("mip_level", mip_level);

        self.program.bind(device, queue, pass);
        pass.set_bind_group(1, &bind_group, &[]);
        geometry.draw_cube(pass);
    }
}
