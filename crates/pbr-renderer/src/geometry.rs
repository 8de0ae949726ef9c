//! Shared unit cube and full-screen quad buffers

use pbr_core::geometry::{CUBE_POSITIONS, QUAD_VERTICES};
use wgpu::util::DeviceExt;

/// Vertex buffers for the capture cube and the full-screen quad
///
/// Created once per renderer and lent to every pass that needs them.
pub struct GeometryBuffers {
    cube: wgpu::Buffer,
    quad: wgpu::Buffer,
}

impl GeometryBuffers {
    /// Upload both buffers
    pub fn new(device: &wgpu::Device) -> Self {
        let cube = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unit Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(&CUBE_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { cube, quad }
    }

    /// Draw the 36-vertex cube with the currently bound pipeline
    pub fn draw_cube(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.cube.slice(..));
        pass.draw(0..CUBE_POSITIONS.len() as u32, 0..1);
    }

    /// Draw the quad as a 4-vertex triangle strip
    pub fn draw_quad(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}
