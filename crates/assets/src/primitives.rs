//! Procedural meshes, addressable from scripts as `primitive:<name>`.

use crate::mesh::MeshData;
use std::f32::consts::PI;

/// Names accepted by [`primitive`].
pub const NAMES: [&str; 4] = ["quad", "plane", "cube", "sphere"];

pub fn primitive(name: &str) -> Option<MeshData> {
    match name {
        "quad" => Some(quad()),
        "plane" => Some(plane()),
        "cube" => Some(cube()),
        "sphere" => Some(sphere(32, 16)),
        _ => None,
    }
}

/// Square spanning -1..1 in X and Y at z = 0, facing +Z.
pub fn quad() -> MeshData {
    MeshData {
        positions: vec![
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ],
        normals: Some(vec![[0.0, 0.0, 1.0]; 4]),
        indices: vec![[0, 1, 2], [0, 2, 3]],
    }
}

/// Square spanning -1..1 in X and Z at y = 0, facing +Y.
pub fn plane() -> MeshData {
    MeshData {
        positions: vec![
            [-1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 0.0, -1.0],
            [-1.0, 0.0, -1.0],
        ],
        normals: Some(vec![[0.0, 1.0, 0.0]; 4]),
        indices: vec![[0, 1, 2], [0, 2, 3]],
    }
}

/// Axis-aligned cube spanning -1..1, with flat per-face normals.
pub fn cube() -> MeshData {
    // (normal, u axis, v axis) per face
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut mesh = MeshData {
        positions: Vec::with_capacity(24),
        normals: None,
        indices: Vec::with_capacity(12),
    };
    let mut normals = Vec::with_capacity(24);
    for (n, u, v) in FACES {
        let base = mesh.positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = [
                n[0] + su * u[0] + sv * v[0],
                n[1] + su * u[1] + sv * v[1],
                n[2] + su * u[2] + sv * v[2],
            ];
            mesh.positions.push(p);
            normals.push(n);
        }
        mesh.indices.push([base, base + 1, base + 2]);
        mesh.indices.push([base, base + 2, base + 3]);
    }
    mesh.normals = Some(normals);
    mesh
}

/// Unit sphere with smooth normals.
pub fn sphere(segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut positions = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for r in 0..=rings {
        let theta = PI * r as f32 / rings as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        for s in 0..=segments {
            let phi = 2.0 * PI * s as f32 / segments as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            positions.push([sin_t * cos_p, cos_t, -sin_t * sin_p]);
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 2) as usize);
    for r in 0..rings {
        for s in 0..segments {
            let a = r * stride + s;
            let b = a + stride;
            // degenerate triangles at the poles are skipped
            if r != 0 {
                indices.push([a, b, a + 1]);
            }
            if r != rings - 1 {
                indices.push([a + 1, b, b + 1]);
            }
        }
    }

    MeshData {
        normals: Some(positions.clone()),
        positions,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_is_valid() {
        for name in NAMES {
            let mesh = primitive(name).unwrap();
            assert!(mesh.validate().is_ok(), "{name}");
        }
        assert!(primitive("teapot").is_none());
    }

    #[test]
    fn cube_bounds() {
        let bounds = cube().bounds();
        assert_eq!(bounds.min, glam::Vec3::splat(-1.0));
        assert_eq!(bounds.max, glam::Vec3::splat(1.0));
        assert_eq!(cube().triangle_count(), 12);
    }

    #[test]
    fn sphere_vertices_on_unit_radius() {
        let mesh = sphere(8, 4);
        for p in &mesh.positions {
            let len = glam::Vec3::from(*p).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
        assert_eq!(mesh.triangle_count(), 8 * 4 * 2 - 2 * 8);
    }
}
