//! CPU-side meshes.
//!
//! Meshes are unindexed triangle lists: every OBJ face corner becomes its own
//! vertex, and vertex color is set to the vertex normal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use glam::Vec3;
use manaburn_rhi::vertex::Vertex;
use tracing::{debug, info, warn};

use crate::error::{ResourceError, ResourceResult};

/// Vertex list ready for upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
}

impl MeshData {
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>) -> Self {
        Self {
            name: name.into(),
            vertices,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex data as bytes for a buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// The built-in triangle: three pure-green vertices facing +Z.
pub fn triangle_mesh() -> MeshData {
    let green = Vec3::new(0.0, 1.0, 0.0);
    let normal = Vec3::Z;

    MeshData::new(
        "triangle",
        vec![
            Vertex::new(Vec3::new(1.0, 1.0, 0.0), normal, green),
            Vertex::new(Vec3::new(-1.0, 1.0, 0.0), normal, green),
            Vertex::new(Vec3::new(0.0, -1.0, 0.0), normal, green),
        ],
    )
}

/// Loads an OBJ file from disk.
///
/// Material libraries are ignored; faces are triangulated.
///
/// # Errors
///
/// Returns [`ResourceError::FileNotFound`] if `path` does not exist,
/// [`ResourceError::ObjLoad`] if parsing fails, and
/// [`ResourceError::EmptyMesh`] if no triangles were found.
pub fn load_obj(path: &Path) -> ResourceResult<MeshData> {
    if !path.exists() {
        return Err(ResourceError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());

    let mesh = load_obj_from_reader(&mut reader, &name).map_err(|e| match e {
        ResourceError::ObjLoad { source, .. } => ResourceError::ObjLoad {
            path: path.to_path_buf(),
            source,
        },
        ResourceError::EmptyMesh(_) => ResourceError::EmptyMesh(path.to_path_buf()),
        other => other,
    })?;

    info!(
        "Loaded OBJ mesh '{}' from {:?}: {} vertices",
        mesh.name,
        path,
        mesh.vertices.len()
    );

    Ok(mesh)
}

/// Parses OBJ text from any buffered reader.
///
/// # Errors
///
/// See [`load_obj`]. Errors carry `name` in place of a file path.
pub fn load_obj_from_reader<R: BufRead>(reader: &mut R, name: &str) -> ResourceResult<MeshData> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj_buf(reader, &options, |_| Ok(Default::default()))
        .map_err(|source| ResourceError::ObjLoad {
        path: PathBuf::from(name),
        source,
    })?;

    let mut vertices = Vec::new();
    for model in &models {
        let before = vertices.len();
        append_model_vertices(&model.mesh, &mut vertices);
        debug!(
            "OBJ shape '{}': {} vertices",
            model.name,
            vertices.len() - before
        );
    }

    if vertices.is_empty() {
        return Err(ResourceError::EmptyMesh(PathBuf::from(name)));
    }

    Ok(MeshData::new(name, vertices))
}

/// Expand one indexed tobj mesh into per-corner vertices.
fn append_model_vertices(mesh: &tobj::Mesh, out: &mut Vec<Vertex>) {
    let has_normals = mesh.normals.len() == mesh.positions.len();
    if !has_normals {
        warn!("OBJ shape has no per-vertex normals, using zero normals");
    }

    out.reserve(mesh.indices.len());
    for &index in &mesh.indices {
        let i = 3 * index as usize;
        let position = Vec3::new(
            mesh.positions[i],
            mesh.positions[i + 1],
            mesh.positions[i + 2],
        );
        let normal = if has_normals {
            Vec3::new(mesh.normals[i], mesh.normals[i + 1], mesh.normals[i + 2])
        } else {
            Vec3::ZERO
        };

        out.push(Vertex::new(position, normal, normal));
    }
}
