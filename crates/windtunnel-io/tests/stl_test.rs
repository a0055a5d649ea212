//! STL decoding tests
//!
//! Covers both encodings and the malformed inputs that must abort setup before any cell is
//! voxelized.

use std::path::Path;

use glam::Vec3;
use windtunnel_io::{stl::read_stl, DecodingError};

const TETRAHEDRON: [[Vec3; 3]; 4] = [
    [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
    [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)],
    [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)],
    [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)],
];

fn write_binary(path: &Path, triangles: &[[Vec3; 3]], declared: u32) {
    let mut bytes = vec![0u8; 80];
    bytes[..5].copy_from_slice(b"solid");
    bytes.extend_from_slice(&declared.to_le_bytes());

    for tri in triangles {
        for v in std::iter::once(Vec3::ZERO).chain(tri.iter().copied()) {
            for c in v.to_array() {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&[0, 0]);
    }

    std::fs::write(path, bytes).unwrap();
}

fn ascii(triangles: &[[Vec3; 3]]) -> String {
    let mut s = String::from("solid tetra\n");
    for tri in triangles {
        s.push_str("  facet normal 0 0 0\n    outer loop\n");
        for v in tri {
            s.push_str(&format!("      vertex {} {} {}\n", v.x, v.y, v.z));
        }
        s.push_str("    endloop\n  endfacet\n");
    }
    s.push_str("endsolid tetra\n");
    s
}

#[test]
fn test_binary_stl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tetra.stl");
    write_binary(&path, &TETRAHEDRON, 4);

    let mesh = read_stl(&path).unwrap();

    assert_eq!(mesh.triangles, TETRAHEDRON.to_vec());
}

#[test]
fn test_ascii_stl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tetra.stl");
    std::fs::write(&path, ascii(&TETRAHEDRON)).unwrap();

    let mesh = read_stl(&path).unwrap();

    assert_eq!(mesh.len(), 4);
    assert_eq!(mesh.bounds(), (Vec3::ZERO, Vec3::ONE));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_stl(dir.path().join("nope.stl")).unwrap_err();

    assert!(matches!(err, DecodingError::Io(_)), "got {err:?}");
}

#[test]
fn test_truncated_binary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.stl");
    write_binary(&path, &TETRAHEDRON[..3], 4);

    // The header starts with "solid", so this falls through to the ASCII reader, which rejects
    // the binary garbage.
    assert!(read_stl(&path).is_err());

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[..5].copy_from_slice(b"xxxxx");
    std::fs::write(&path, bytes).unwrap();

    let err = read_stl(&path).unwrap_err();
    assert!(matches!(err, DecodingError::Truncated { expected: 4, .. }), "got {err:?}");
}

#[test]
fn test_facet_with_wrong_vertex_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quad.stl");
    let text = ascii(&TETRAHEDRON[..1]).replace("    endloop", "      vertex 1 1 1\n    endloop");
    std::fs::write(&path, text).unwrap();

    let err = read_stl(&path).unwrap_err();
    assert!(matches!(err, DecodingError::FacetVertices { count: 4, .. }), "got {err:?}");
}

#[test]
fn test_empty_solid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.stl");
    std::fs::write(&path, "solid nothing\nendsolid nothing\n").unwrap();

    assert!(matches!(read_stl(&path), Err(DecodingError::Empty)));
}

#[test]
fn test_bad_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.stl");
    std::fs::write(&path, ascii(&TETRAHEDRON).replacen("vertex 0 0 0", "vertex 0 zero 0", 1)).unwrap();

    assert!(matches!(read_stl(&path), Err(DecodingError::Syntax { line: 4 })));
}
