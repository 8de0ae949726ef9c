//! Shader programs with name-keyed uniforms
//!
//! A [`GpuProgram`] pairs a render pipeline with a CPU [`UniformBlock`] and a
//! ring of uniform slots. Callers write uniforms by name, then
//! [`GpuProgram::commit`] copies the block into the next slot and returns the
//! dynamic offset to bind for the following draw. Each draw within a frame
//! therefore sees the values that were current when it was recorded.

use std::sync::Arc;

use pbr_core::{UniformBlock, UniformLayout, UniformTarget, UniformValue};

use crate::error::RenderError;

/// Run `create` inside a validation error scope and turn failures into errors
pub fn checked<T>(
    device: &wgpu::Device,
    label: &str,
    create: impl FnOnce() -> T,
) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => {
            tracing::error!("Shader '{}' failed: {}", label, error);
            Err(RenderError::ShaderCompile {
                label: label.to_string(),
                message: error.to_string(),
            })
        }
        None => Ok(value),
    }
}

/// Compile a WGSL module, reporting validation errors as [`RenderError::ShaderCompile`]
pub fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    checked(device, label, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    })
}

/// Bind group layout for a single dynamic-offset uniform buffer at binding 0
pub fn uniform_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
    size: u64,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(size),
            },
            count: None,
        }],
    })
}

/// Render pipeline description shared by the model, bake, shadow and marker passes
///
/// Color passes name a `format`; the shadow pass leaves it `None` and gets a
/// depth-only pipeline without a fragment stage.
pub struct PipelineConfig<'a> {
    /// Prefix of the module, layout and pipeline labels
    pub label: &'a str,
    /// WGSL source with `vs_main` and, for color passes, `fs_main`
    pub shader_source: &'a str,
    /// Color target; `None` drops the fragment stage
    pub format: Option<wgpu::TextureFormat>,
    /// Depth target; bake passes render without one
    pub depth_format: Option<wgpu::TextureFormat>,
    /// Group 0 is always the program's uniform ring
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    /// Empty for passes that generate vertices in the shader
    pub vertex_layouts: Vec<wgpu::VertexBufferLayout<'a>>,
    /// Triangle list unless set otherwise
    pub topology: wgpu::PrimitiveTopology,
    /// No culling unless set otherwise
    pub cull_mode: Option<wgpu::Face>,
    /// Ignored without a depth target
    pub depth_write: bool,
    /// Ignored without a depth target
    pub depth_compare: wgpu::CompareFunction,
}

impl<'a> PipelineConfig<'a> {
    /// Triangle list, no culling and no depth target
    ///
    /// That is what the full-screen bake passes need; scene passes add depth
    /// and culling through the builders.
    pub fn new(
        label: &'a str,
        shader_source: &'a str,
        format: Option<wgpu::TextureFormat>,
        bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    ) -> Self {
        Self {
            label,
            shader_source,
            format,
            depth_format: None,
            bind_group_layouts,
            vertex_layouts: Vec::new(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
        }
    }

    /// Vertex buffers in slot order
    pub fn with_vertex_layouts(mut self, layouts: Vec<wgpu::VertexBufferLayout<'a>>) -> Self {
        self.vertex_layouts = layouts;
        self
    }

    /// Strips for the full-screen quad
    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Back faces for models, front faces for shadow casters
    pub fn with_cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Depth-test against `format`; the skybox tests without writing
    pub fn with_depth(
        mut self,
        format: wgpu::TextureFormat,
        write: bool,
        compare: wgpu::CompareFunction,
    ) -> Self {
        self.depth_format = Some(format);
        self.depth_write = write;
        self.depth_compare = compare;
        self
    }

    /// Compile the module and pipeline, each inside a validation scope
    pub fn build(self, device: &wgpu::Device) -> Result<wgpu::RenderPipeline, RenderError> {
        let shader = create_shader_module(device, self.label, self.shader_source)?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", self.label)),
            bind_group_layouts: self.bind_group_layouts,
            push_constant_ranges: &[],
        });

        let targets = [self.format.map(|format| wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];

        checked(device, self.label, || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{} Pipeline", self.label)),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &self.vertex_layouts,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: self.format.map(|_| wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: self.topology,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: self.cull_mode,
                    ..Default::default()
                },
                depth_stencil: self.depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: self.depth_write,
                    depth_compare: self.depth_compare,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }
}

/// A render pipeline plus its uniform block and per-draw uniform slots
pub struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    block: UniformBlock,
    bind_group_layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    slot_stride: u64,
    capacity: u32,
    next_slot: u32,
}

fn create_ring(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    binding_size: u64,
    ring_size: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} Uniforms")),
        size: ring_size,
        usage: wgpu::BufferUsages::UNIFORM
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label} Uniform Bind Group")),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(binding_size),
            }),
        }],
    });
    (buffer, bind_group)
}

impl GpuProgram {
    /// Wrap `pipeline`, starting with `capacity` uniform slots for `layout`
    ///
    /// `bind_group_layout` must have been created with
    /// [`uniform_bind_group_layout`] for the same layout size. The ring
    /// doubles whenever a frame records more draws than it holds.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        pipeline: wgpu::RenderPipeline,
        layout: Arc<UniformLayout>,
        bind_group_layout: wgpu::BindGroupLayout,
        capacity: u32,
    ) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = layout.size() as u64;
        let slot_stride = size.div_ceil(alignment) * alignment;
        let capacity = capacity.max(1);
        let (buffer, bind_group) = create_ring(
            device,
            label,
            &bind_group_layout,
            size,
            slot_stride * capacity as u64,
        );

        Self {
            label: label.to_string(),
            pipeline,
            block: UniformBlock::new(layout),
            bind_group_layout,
            buffer,
            bind_group,
            slot_stride,
            capacity,
            next_slot: 0,
        }
    }

    /// Debug label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Pipeline to bind
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Uniform bind group (group 0), used with the offset from [`Self::commit`]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Buffer behind [`Self::bind_group`]
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Slots the ring currently holds
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Current CPU-side uniform values
    pub fn block(&self) -> &UniformBlock {
        &self.block
    }

    /// Start reusing uniform slots from the beginning
    pub fn begin_frame(&mut self) {
        self.next_slot = 0;
    }

    /// Replace the ring with one twice as large holding the slots written so far
    ///
    /// Draws already recorded keep the old bind group, which keeps the old
    /// buffer alive until they have executed.
    fn grow(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let capacity = self.capacity.saturating_mul(2);
        let (buffer, bind_group) = create_ring(
            device,
            &self.label,
            &self.bind_group_layout,
            self.block.bytes().len() as u64,
            self.slot_stride * capacity as u64,
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Uniform Ring Copy"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &buffer, 0, self.buffer.size());
        queue.submit(Some(encoder.finish()));

        tracing::debug!(
            "Program '{}' uniform ring grown to {} slots",
            self.label,
            capacity
        );
        self.buffer = buffer;
        self.bind_group = bind_group;
        self.capacity = capacity;
    }

    /// Upload the current values to a fresh slot and return its dynamic offset
    pub fn commit(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> u32 {
        if self.next_slot >= self.capacity {
            self.grow(device, queue);
        }
        let offset = self.next_slot as u64 * self.slot_stride;
        queue.write_buffer(&self.buffer, offset, self.block.bytes());
        self.next_slot += 1;
        offset as u32
    }

    /// Bind pipeline and uniforms for one draw
    pub fn bind(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pass: &mut wgpu::RenderPass<'_>,
    ) {
        let offset = self.commit(device, queue);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[offset]);
    }
}

impl UniformTarget for GpuProgram {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.block.set_uniform(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use pbr_core::shading::shadow_layout;

    #[test]
    fn test_invalid_shader_reports_compile_error() {
        let Some(ctx) = test_context() else { return };
        let result = create_shader_module(&ctx.device, "broken", "fn main( {");
        match result {
            Err(RenderError::ShaderCompile { label, .. }) => assert_eq!(label, "broken"),
            other => panic!("expected compile error, got {:?}", other.map(|_| ())),
        }
    }

    fn read_buffer(ctx: &crate::context::GpuContext, buffer: &wgpu::Buffer) -> Vec<f32> {
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Test Staging"),
            size: buffer.size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, buffer.size());
        ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv().unwrap().unwrap();
        let values = bytemuck::pod_collect_to_vec(&slice.get_mapped_range()[..]);
        staging.unmap();
        values
    }

    #[test]
    fn test_full_ring_grows_and_keeps_every_draw() {
        let Some(ctx) = test_context() else { return };
        let layout = Arc::new(shadow_layout());
        let bgl = uniform_bind_group_layout(&ctx.device, "Test Uniforms", layout.size() as u64);
        let pipeline = PipelineConfig::new("Test Shadow", include_str!("shaders/self_shadow.wgsl"), None, &[&bgl])
            .with_vertex_layouts(vec![crate::vertex::shadow_vertex_layout()])
            .with_depth(crate::texture::DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
            .build(&ctx.device)
            .expect("shadow pipeline");
        let mut program = GpuProgram::new(&ctx.device, "Test", pipeline, layout, bgl, 3);
        let stride = ctx.device.limits().min_uniform_buffer_offset_alignment;
        let model_offset = program.block().layout().slot("model").expect("model slot").offset;

        // Draw i carries a model matrix scaled by i + 1
        for i in 0..5u32 {
            program.set_mat4("model", glam::Mat4::from_scale(glam::Vec3::splat((i + 1) as f32)));
            assert_eq!(program.commit(&ctx.device, &ctx.queue), i * stride);
        }
        assert_eq!(program.capacity(), 6);

        let values = read_buffer(&ctx, program.uniform_buffer());
        for i in 0..5u32 {
            let first = ((i * stride + model_offset) / 4) as usize;
            assert_eq!(values[first], (i + 1) as f32, "draw {i}");
        }

        program.begin_frame();
        assert_eq!(program.commit(&ctx.device, &ctx.queue), 0);
        assert_eq!(program.capacity(), 6);
    }
}
