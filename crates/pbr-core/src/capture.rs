//! Cube face capture cameras
//!
//! Every cubemap generation step renders the same six views from the origin:
//! one 90 degree camera per face, each with a fixed up vector. The face order
//! matches the array layer order of a cube texture (+X, -X, +Y, -Y, +Z, -Z).

use glam::{Mat4, Vec3};

use crate::constants::{CAPTURE_FAR, CAPTURE_NEAR};

/// One face of a cubemap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// All faces in array layer order
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of this face in a cube texture
    pub fn layer(self) -> u32 {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }

    /// Direction the capture camera looks along
    pub fn look(self) -> Vec3 {
        match self {
            CubeFace::PositiveX => Vec3::X,
            CubeFace::NegativeX => Vec3::NEG_X,
            CubeFace::PositiveY => Vec3::Y,
            CubeFace::NegativeY => Vec3::NEG_Y,
            CubeFace::PositiveZ => Vec3::Z,
            CubeFace::NegativeZ => Vec3::NEG_Z,
        }
    }

    /// Up vector of the capture camera
    pub fn up(self) -> Vec3 {
        match self {
            CubeFace::PositiveX | CubeFace::NegativeX => Vec3::NEG_Y,
            CubeFace::PositiveY => Vec3::Z,
            CubeFace::NegativeY => Vec3::NEG_Z,
            CubeFace::PositiveZ | CubeFace::NegativeZ => Vec3::NEG_Y,
        }
    }

    /// View matrix of the capture camera placed at the origin
    pub fn view(self) -> Mat4 {
        Mat4::look_at_rh(Vec3::ZERO, self.look(), self.up())
    }

    /// Short label used in GPU debug names
    pub fn label(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "+X",
            CubeFace::NegativeX => "-X",
            CubeFace::PositiveY => "+Y",
            CubeFace::NegativeY => "-Y",
            CubeFace::PositiveZ => "+Z",
            CubeFace::NegativeZ => "-Z",
        }
    }
}

/// World direction through texture coordinate (`s`, `t`) of `face`
///
/// Uses the cube sampling convention shared by every graphics API: `t` grows
/// along the face's -up direction.
pub fn cube_face_direction(face: CubeFace, s: f32, t: f32) -> Vec3 {
    let sc = 2.0 * s - 1.0;
    let tc = 2.0 * t - 1.0;
    let dir = match face {
        CubeFace::PositiveX => Vec3::new(1.0, -tc, -sc),
        CubeFace::NegativeX => Vec3::new(-1.0, -tc, sc),
        CubeFace::PositiveY => Vec3::new(sc, 1.0, tc),
        CubeFace::NegativeY => Vec3::new(sc, -1.0, -tc),
        CubeFace::PositiveZ => Vec3::new(sc, -tc, 1.0),
        CubeFace::NegativeZ => Vec3::new(-sc, -tc, -1.0),
    };
    dir.normalize()
}

/// View matrices for all six faces, in array layer order
pub fn capture_views() -> [Mat4; 6] {
    CubeFace::ALL.map(CubeFace::view)
}

/// Projection shared by every face capture
pub fn capture_projection() -> Mat4 {
    Mat4::perspective_rh(90.0_f32.to_radians(), 1.0, CAPTURE_NEAR, CAPTURE_FAR)
}

/// Edge length of `mip` for a face whose base level is `base` texels wide
pub fn mip_size(base: u32, mip: u32) -> u32 {
    (base >> mip).max(1)
}

/// Number of mip levels in a full chain for a face `size` texels wide
pub fn full_mip_count(size: u32) -> u32 {
    32 - size.max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_forward_matches_look() {
        for face in CubeFace::ALL {
            let view = face.view();
            // Camera looks down -Z in view space
            let forward = -view.row(2).truncate();
            assert_relative_eq!(forward.dot(face.look()), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_up_vectors_unit_and_orthogonal() {
        for face in CubeFace::ALL {
            assert_relative_eq!(face.up().length(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(face.up().dot(face.look()), 0.0, epsilon = 1e-6);
            assert_relative_eq!(face.look().length(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_layers_are_distinct() {
        let layers: Vec<u32> = CubeFace::ALL.iter().map(|f| f.layer()).collect();
        assert_eq!(layers, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_capture_projection_is_square_90_degrees() {
        let proj = capture_projection();
        // cot(45 degrees) == 1 on both axes
        assert_relative_eq!(proj.x_axis.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(proj.y_axis.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_face_center_projects_to_origin() {
        let proj = capture_projection();
        for (face, view) in CubeFace::ALL.iter().zip(capture_views()) {
            let clip = proj * view * face.look().extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
            assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_capture_matches_cube_sampling_convention() {
        // A direction sampled at (s, t) must be rendered at ndc (2s-1, 2t-1)
        // before the render-to-texture y flip
        let proj = capture_projection();
        for face in CubeFace::ALL {
            for (s, t) in [(0.25, 0.1), (0.8, 0.6), (0.5, 0.5)] {
                let dir = cube_face_direction(face, s, t);
                let clip = proj * face.view() * dir.extend(1.0);
                let ndc = clip.truncate() / clip.w;
                assert_relative_eq!(ndc.x, 2.0 * s - 1.0, epsilon = 1e-5);
                assert_relative_eq!(ndc.y, 2.0 * t - 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_mip_sizes() {
        assert_eq!(mip_size(512, 0), 512);
        assert_eq!(mip_size(512, 4), 32);
        assert_eq!(mip_size(4, 5), 1);
        assert_eq!(full_mip_count(2048), 12);
        assert_eq!(full_mip_count(1), 1);
    }
}
