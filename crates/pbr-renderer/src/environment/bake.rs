//! Pipelines and passes of the environment precomputation

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use pbr_core::{CubeFace, capture_projection};

use crate::error::RenderError;
use crate::geometry::GeometryBuffers;
use crate::program::PipelineConfig;
use crate::texture::{BRDF_LUT_FORMAT, HDR_FORMAT};
use crate::vertex::{cube_vertex_layout, quad_vertex_layout};

const EQUIRECT_TO_CUBE_SHADER: &str = concat!(
    include_str!("../shaders/bake.wgsl"),
    include_str!("../shaders/capture.wgsl"),
    include_str!("../shaders/equirect_to_cube.wgsl"),
);

const IRRADIANCE_SHADER: &str = concat!(
    include_str!("../shaders/bake.wgsl"),
    include_str!("../shaders/capture.wgsl"),
    include_str!("../shaders/irradiance.wgsl"),
);

const PREFILTER_SHADER: &str = concat!(
    include_str!("../shaders/bake.wgsl"),
    include_str!("../shaders/capture.wgsl"),
    include_str!("../shaders/prefilter.wgsl"),
);

const BRDF_LUT_SHADER: &str = concat!(
    include_str!("../shaders/bake.wgsl"),
    include_str!("../shaders/quad.wgsl"),
    include_str!("../shaders/brdf_lut.wgsl"),
);

const DOWNSAMPLE_SHADER: &str = concat!(
    include_str!("../shaders/quad.wgsl"),
    include_str!("../shaders/downsample.wgsl"),
);

/// Per-pass parameters, mirrors `BakeParams` in bake.wgsl
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BakeParams {
    pub view_projection: [[f32; 4]; 4],
    pub roughness: f32,
    pub sample_count: u32,
    pub sample_delta: f32,
    pub source_resolution: f32,
}

impl BakeParams {
    /// Parameters for rendering cube face `face`
    pub fn for_face(face: CubeFace) -> Self {
        Self {
            view_projection: (capture_projection() * face.view()).to_cols_array_2d(),
            ..Self::quad()
        }
    }

    /// Parameters for a full-screen quad pass
    pub fn quad() -> Self {
        Self {
            view_projection: Mat4::IDENTITY.to_cols_array_2d(),
            roughness: 0.0,
            sample_count: 0,
            sample_delta: 0.0,
            source_resolution: 0.0,
        }
    }
}

fn bake_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
    with_params: bool,
    source: Option<wgpu::TextureViewDimension>,
) -> wgpu::BindGroupLayout {
    let mut entries = Vec::new();
    if with_params {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
    }
    if let Some(view_dimension) = source {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

/// One bake pipeline with the layout of its single bind group
pub struct BakePass {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    with_params: bool,
    cube: bool,
}

impl BakePass {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        shader_source: &str,
        format: wgpu::TextureFormat,
        with_params: bool,
        source: Option<wgpu::TextureViewDimension>,
        cube: bool,
    ) -> Result<Self, RenderError> {
        let layout = bake_bind_group_layout(device, &format!("{label} Layout"), with_params, source);
        let layouts = [&layout];
        // Render-to-texture passes flip y, so winding is not meaningful here
        let config = PipelineConfig::new(label, shader_source, Some(format), &layouts);
        let config = if cube {
            config.with_vertex_layouts(vec![cube_vertex_layout()])
        } else {
            config
                .with_vertex_layouts(vec![quad_vertex_layout()])
                .with_topology(wgpu::PrimitiveTopology::TriangleStrip)
        };
        let pipeline = config.build(device)?;
        Ok(Self {
            label,
            pipeline,
            layout,
            with_params,
            cube,
        })
    }

    /// Record one pass into `target`
    ///
    /// Each call gets its own parameter buffer so passes recorded into the
    /// same encoder never observe each other's values.
    pub fn record(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        geometry: &GeometryBuffers,
        target: &wgpu::TextureView,
        params: &BakeParams,
        source: Option<(&wgpu::TextureView, &wgpu::Sampler)>,
    ) {
        let params_buffer = self.with_params.then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Params", self.label)),
                contents: bytemuck::bytes_of(params),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        let mut entries = Vec::new();
        if let Some(buffer) = &params_buffer {
            entries.push(wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            });
        }
        if let Some((view, sampler)) = source {
            entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", self.label)),
            layout: &self.layout,
            entries: &entries,
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        if self.cube {
            geometry.draw_cube(&mut pass);
        } else {
            geometry.draw_quad(&mut pass);
        }
    }
}

/// Every pipeline the environment bake needs
pub struct BakePipelines {
    pub equirect_to_cube: BakePass,
    pub irradiance: BakePass,
    pub prefilter: BakePass,
    pub brdf_lut: BakePass,
    pub downsample: BakePass,
}

impl BakePipelines {
    /// Compile all bake shaders
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        use wgpu::TextureViewDimension::{Cube, D2};

        Ok(Self {
            equirect_to_cube: BakePass::new(
                device,
                "Equirectangular To Cubemap",
                EQUIRECT_TO_CUBE_SHADER,
                HDR_FORMAT,
                true,
                Some(D2),
                true,
            )?,
            irradiance: BakePass::new(
                device,
                "Irradiance Convolution",
                IRRADIANCE_SHADER,
                HDR_FORMAT,
                true,
                Some(Cube),
                true,
            )?,
            prefilter: BakePass::new(
                device,
                "Prefilter Environment",
                PREFILTER_SHADER,
                HDR_FORMAT,
                true,
                Some(Cube),
                true,
            )?,
            brdf_lut: BakePass::new(
                device,
                "BRDF Integration",
                BRDF_LUT_SHADER,
                BRDF_LUT_FORMAT,
                true,
                None,
                false,
            )?,
            downsample: BakePass::new(
                device,
                "Cube Face Downsample",
                DOWNSAMPLE_SHADER,
                HDR_FORMAT,
                false,
                Some(D2),
                false,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bake_params_layout() {
        // mat4 + four scalars, a multiple of 16 as uniform buffers require
        assert_eq!(std::mem::size_of::<BakeParams>(), 80);
    }

    #[test]
    fn test_face_params_use_capture_projection() {
        let params = BakeParams::for_face(CubeFace::PositiveX);
        let expected = capture_projection() * CubeFace::PositiveX.view();
        assert_eq!(params.view_projection, expected.to_cols_array_2d());
        assert_eq!(BakeParams::quad().view_projection, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn test_bake_shaders_compile() {
        let Some(ctx) = crate::context::test_context() else { return };
        BakePipelines::new(&ctx.device).expect("bake pipelines");
    }
}
