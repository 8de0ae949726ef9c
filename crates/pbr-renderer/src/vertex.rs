//! Vertex buffer layouts
//!
//! Attribute offsets are computed from the struct fields with
//! `std::mem::offset_of!`, so they stay correct if the vertex types change.

use pbr_core::Vertex;
use pbr_core::geometry::QuadVertex;

/// Creates a vertex attribute with the offset calculated from the struct field.
#[macro_export]
macro_rules! vertex_attr {
    ($struct:ty, $field:ident, $location:expr, $format:ident) => {
        wgpu::VertexAttribute {
            offset: std::mem::offset_of!($struct, $field) as u64,
            shader_location: $location,
            format: wgpu::VertexFormat::$format,
        }
    };
}

/// Creates a per-vertex buffer layout for `T`.
pub fn vertex_buffer_layout<T>(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<T>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

/// Attributes of [`Vertex`] as read by the model programs.
pub const MODEL_VERTEX_ATTRIBUTES: &[wgpu::VertexAttribute] = &[
    vertex_attr!(Vertex, position, 0, Float32x3),
    vertex_attr!(Vertex, normal, 1, Float32x3),
    vertex_attr!(Vertex, uv, 2, Float32x2),
    vertex_attr!(Vertex, tangent, 3, Float32x3),
    vertex_attr!(Vertex, bitangent, 4, Float32x3),
];

/// Position-only view of [`Vertex`] for the depth-only shadow program.
pub const SHADOW_VERTEX_ATTRIBUTES: &[wgpu::VertexAttribute] =
    &[vertex_attr!(Vertex, position, 0, Float32x3)];

/// Attributes of [`QuadVertex`].
pub const QUAD_VERTEX_ATTRIBUTES: &[wgpu::VertexAttribute] = &[
    vertex_attr!(QuadVertex, position, 0, Float32x3),
    vertex_attr!(QuadVertex, uv, 1, Float32x2),
];

/// Attributes of a bare cube position.
pub const CUBE_VERTEX_ATTRIBUTES: &[wgpu::VertexAttribute] = &[wgpu::VertexAttribute {
    offset: 0,
    shader_location: 0,
    format: wgpu::VertexFormat::Float32x3,
}];

/// Layout of model vertex buffers.
pub fn model_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    vertex_buffer_layout::<Vertex>(MODEL_VERTEX_ATTRIBUTES)
}

/// Layout of model vertex buffers as read by the shadow program.
pub fn shadow_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    vertex_buffer_layout::<Vertex>(SHADOW_VERTEX_ATTRIBUTES)
}

/// Layout of the full-screen quad buffer.
pub fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    vertex_buffer_layout::<QuadVertex>(QUAD_VERTEX_ATTRIBUTES)
}

/// Layout of the unit cube buffer.
pub fn cube_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    vertex_buffer_layout::<[f32; 3]>(CUBE_VERTEX_ATTRIBUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_attribute_offsets() {
        let offsets: Vec<u64> = MODEL_VERTEX_ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32, 44]);
        assert_eq!(model_vertex_layout().array_stride, 56);
        assert_eq!(shadow_vertex_layout().array_stride, 56);
    }

    #[test]
    fn test_quad_layout() {
        assert_eq!(quad_vertex_layout().array_stride, 20);
        assert_eq!(QUAD_VERTEX_ATTRIBUTES[1].offset, 12);
        assert_eq!(cube_vertex_layout().array_stride, 12);
    }
}
