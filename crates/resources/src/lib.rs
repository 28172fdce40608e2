//! Resource loading.
//!
//! Produces CPU-side vertex lists for the renderer to upload:
//! - the built-in triangle mesh
//! - Wavefront OBJ meshes via `tobj`

mod error;

pub mod mesh;

pub use error::{ResourceError, ResourceResult};
pub use mesh::{MeshData, load_obj, load_obj_from_reader, triangle_mesh};
