//! OBJ mesh loading

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::AssetError;
use crate::texture::{TextureKind, TextureRef};

/// Vertex layout consumed by the model programs
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

/// One drawable sub-mesh with its material textures
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<TextureRef>,
}

/// All sub-meshes of one model file
#[derive(Debug, Clone)]
pub struct ModelData {
    pub path: PathBuf,
    pub meshes: Vec<MeshData>,
}

impl ModelData {
    /// Axis-aligned bounds over every vertex
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self
            .meshes
            .iter()
            .flat_map(|m| m.vertices.iter().map(|v| Vec3::from(v.position)));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Center the model at the origin and scale it to fit in a sphere of `radius`
    pub fn fit_to_radius(&mut self, radius: f32) {
        let Some((min, max)) = self.bounds() else {
            return;
        };
        let center = (min + max) * 0.5;
        let extent = (max - min).length() * 0.5;
        if extent <= f32::EPSILON {
            return;
        }
        let scale = radius / extent;
        for mesh in &mut self.meshes {
            for v in &mut mesh.vertices {
                v.position = ((Vec3::from(v.position) - center) * scale).to_array();
            }
        }
    }

    /// Number of triangles across all meshes
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }
}

/// Load an OBJ file, one [`MeshData`] per object
pub fn load_obj(path: impl AsRef<Path>) -> Result<ModelData, AssetError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AssetError::Io(format!("{} not found", path.display())));
    }

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| AssetError::Parse(e.to_string()))?;

    if models.is_empty() {
        return Err(AssetError::EmptyMesh);
    }

    // Missing or broken .mtl files only cost us the textures
    let materials = materials.unwrap_or_else(|e| {
        tracing::warn!("Materials for {} not loaded: {}", path.display(), e);
        Vec::new()
    });
    let base_dir = path.parent().unwrap_or(Path::new("."));

    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        let vertex_count = mesh.positions.len() / 3;
        if vertex_count == 0 || mesh.indices.is_empty() {
            continue;
        }

        let positions: Vec<Vec3> = mesh
            .positions
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        let uvs: Vec<Vec2> = if mesh.texcoords.len() / 2 == vertex_count {
            mesh.texcoords
                .chunks_exact(2)
                .map(|c| Vec2::new(c[0], c[1]))
                .collect()
        } else {
            vec![Vec2::ZERO; vertex_count]
        };
        let normals: Vec<Vec3> = if mesh.normals.len() / 3 == vertex_count {
            mesh.normals
                .chunks_exact(3)
                .map(|c| Vec3::new(c[0], c[1], c[2]).normalize_or_zero())
                .collect()
        } else {
            smooth_normals(&positions, &mesh.indices)
        };
        let (tangents, bitangents) = tangent_frames(&positions, &normals, &uvs, &mesh.indices);

        let vertices = (0..vertex_count)
            .map(|i| Vertex {
                position: positions[i].to_array(),
                normal: normals[i].to_array(),
                uv: uvs[i].to_array(),
                tangent: tangents[i].to_array(),
                bitangent: bitangents[i].to_array(),
            })
            .collect();

        let textures = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .map(|material| material_textures(material, base_dir))
            .unwrap_or_default();

        meshes.push(MeshData {
            name: model.name,
            vertices,
            indices: mesh.indices,
            textures,
        });
    }

    if meshes.is_empty() {
        return Err(AssetError::EmptyMesh);
    }

    tracing::info!("Loaded {} ({} meshes)", path.display(), meshes.len());
    Ok(ModelData {
        path: path.to_path_buf(),
        meshes,
    })
}

fn material_textures(material: &tobj::Material, base_dir: &Path) -> Vec<TextureRef> {
    let mut textures = Vec::new();
    let mut push = |kind: TextureKind, file: Option<&String>| {
        if let Some(file) = file
            && !file.is_empty()
        {
            textures.push(TextureRef::from_file(kind, base_dir.join(file)));
        }
    };
    push(TextureKind::Diffuse, material.diffuse_texture.as_ref());
    push(TextureKind::Normal, material.normal_texture.as_ref());
    push(TextureKind::Roughness, material.unknown_param.get("map_Pr"));
    push(TextureKind::Emissive, material.unknown_param.get("map_Ke"));
    textures
}

/// Area-weighted vertex normals
pub fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals.iter().map(|n| n.normalize_or(Vec3::Y)).collect()
}

/// Per-vertex tangent and bitangent from texture coordinates
///
/// Vertices without usable coordinates get an arbitrary frame orthogonal to
/// their normal.
pub fn tangent_frames(
    positions: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    indices: &[u32],
) -> (Vec<Vec3>, Vec<Vec3>) {
    let mut tangents = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let e1 = positions[b] - positions[a];
        let e2 = positions[c] - positions[a];
        let d1 = uvs[b] - uvs[a];
        let d2 = uvs[c] - uvs[a];
        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-12 {
            continue;
        }
        let t = (e1 * d2.y - e2 * d1.y) / det;
        tangents[a] += t;
        tangents[b] += t;
        tangents[c] += t;
    }

    let mut bitangents = Vec::with_capacity(positions.len());
    for (t, n) in tangents.iter_mut().zip(normals) {
        // Gram-Schmidt against the normal
        let mut ortho = (*t - *n * n.dot(*t)).normalize_or_zero();
        if ortho == Vec3::ZERO {
            ortho = n.any_orthonormal_vector();
        }
        *t = ortho;
        bitangents.push(n.cross(ortho));
    }
    (tangents, bitangents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    const QUAD_OBJ: &str = "\
o quad
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 4/4 3/3 2/2
";

    #[test]
    fn test_load_obj_generates_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(QUAD_OBJ.as_bytes())
            .unwrap();

        let model = load_obj(&path).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 2);
        for v in &model.meshes[0].vertices {
            assert_relative_eq!(v.normal[1], 1.0, epsilon = 1e-5);
            let t = Vec3::from(v.tangent);
            assert_relative_eq!(t.length(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(t.dot(Vec3::from(v.normal)), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_obj("does/not/exist.obj");
        assert!(matches!(result, Err(AssetError::Io(_))));
    }

    #[test]
    fn test_fit_to_radius() {
        let vertex = |p: [f32; 3]| Vertex {
            position: p,
            normal: [0.0, 1.0, 0.0],
            uv: [0.0; 2],
            tangent: [1.0, 0.0, 0.0],
            bitangent: [0.0, 0.0, 1.0],
        };
        let mut model = ModelData {
            path: PathBuf::new(),
            meshes: vec![MeshData {
                name: "box".into(),
                vertices: vec![vertex([2.0, 2.0, 2.0]), vertex([4.0, 6.0, 2.0])],
                indices: vec![],
                textures: vec![],
            }],
        };
        model.fit_to_radius(0.5);
        let (min, max) = model.bounds().unwrap();
        assert_relative_eq!((min + max).length(), 0.0, epsilon = 1e-5);
        assert_relative_eq!((max - min).length(), 1.0, epsilon = 1e-5);
    }
}
