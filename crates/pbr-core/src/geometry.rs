//! Unit cube and full-screen quad vertex data

use bytemuck::{Pod, Zeroable};

/// Vertex of the full-screen quad (clip-space position + texture coordinate)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Full-screen quad drawn as a four-vertex triangle strip
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 1.0] },
    QuadVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 0.0] },
];

/// Positions of a cube spanning [-1, 1] on each axis as 12 triangles
pub const CUBE_POSITIONS: [[f32; 3]; 36] = [
    // back face
    [-1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    // front face
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
    // left face
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    // right face
    [1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    // bottom face
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, -1.0, -1.0],
    // top face
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
];

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_cube_triangles_face_outward() {
        for tri in CUBE_POSITIONS.chunks(3) {
            let a = Vec3::from(tri[0]);
            let b = Vec3::from(tri[1]);
            let c = Vec3::from(tri[2]);
            let normal = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(normal.dot(center) > 0.0, "triangle {tri:?} winds inward");
        }
    }

    #[test]
    fn test_quad_covers_clip_space() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.position[1]).collect();
        assert!(xs.contains(&-1.0) && xs.contains(&1.0));
        assert!(ys.contains(&-1.0) && ys.contains(&1.0));
        for v in QUAD_VERTICES {
            assert_eq!(v.uv[0], (v.position[0] + 1.0) * 0.5);
            assert_eq!(v.uv[1], (v.position[1] + 1.0) * 0.5);
        }
    }
}
