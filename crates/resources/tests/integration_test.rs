//! Integration tests for mesh loading.

use std::io::Write;
use std::path::Path;

use manaburn_resources::{ResourceError, load_obj, triangle_mesh};

const CUBE_FACE_OBJ: &str = "\
# one face of a cube, two triangles
o face
v -1.0 -1.0 1.0
v 1.0 -1.0 1.0
v 1.0 1.0 1.0
v -1.0 1.0 1.0
vn 0.0 0.0 1.0
f 1//1 2//1 3//1
f 1//1 3//1 4//1
";

#[test]
fn test_load_obj_from_disk() {
    let dir = std::env::temp_dir().join("manaburn_resources_test");
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    let path = dir.join("face.obj");

    let mut file = std::fs::File::create(&path).expect("Failed to create OBJ file");
    file.write_all(CUBE_FACE_OBJ.as_bytes())
        .expect("Failed to write OBJ file");
    drop(file);

    let mesh = load_obj(&path).expect("Failed to load OBJ");

    assert_eq!(mesh.name, "face");
    assert_eq!(mesh.vertex_count(), 6);
    for vertex in &mesh.vertices {
        assert_eq!(vertex.color, vertex.normal);
        assert!((vertex.position.z - 1.0).abs() < f32::EPSILON);
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_missing_obj_reports_path() {
    let err = load_obj(Path::new("nowhere/missing.obj")).unwrap_err();
    match err {
        ResourceError::FileNotFound(path) => assert!(path.ends_with("missing.obj")),
        other => panic!("Unexpected error: {other}"),
    }
}

#[test]
fn test_triangle_fallback_is_uploadable() {
    let mesh = triangle_mesh();
    assert_eq!(mesh.as_bytes().len(), 3 * 36);
}
