use glam::Vec3;
use raystage_common::Aabb;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Errors from loading or validating mesh geometry.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("failed to read mesh '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode mesh '{path}': {reason}")]
    Encode { path: PathBuf, reason: String },
    #[error("failed to decode mesh '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("mesh '{path}' has format version {version}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        version: u32,
        expected: u32,
    },
    #[error("mesh '{path}' is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("unknown primitive '{0}'")]
    UnknownPrimitive(String),
}

/// Indexed triangle geometry in object space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals. Faceted shading is used when absent.
    pub normals: Option<Vec<[f32; 3]>>,
    pub indices: Vec<[u32; 3]>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Corner positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        let [a, b, c] = self.indices[i];
        [
            Vec3::from(self.positions[a as usize]),
            Vec3::from(self.positions[b as usize]),
            Vec3::from(self.positions[c as usize]),
        ]
    }

    /// Corner normals of triangle `i`, when the mesh carries normals.
    pub fn triangle_normals(&self, i: usize) -> Option<[Vec3; 3]> {
        let normals = self.normals.as_ref()?;
        let [a, b, c] = self.indices[i];
        Some([
            Vec3::from(normals[a as usize]),
            Vec3::from(normals[b as usize]),
            Vec3::from(normals[c as usize]),
        ])
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().map(|&p| Vec3::from(p)))
    }

    /// Check that the geometry is usable for intersection.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.is_empty() {
            return Err("no triangles".into());
        }
        if let Some(i) = self
            .positions
            .iter()
            .position(|p| p.iter().any(|c| !c.is_finite()))
        {
            return Err(format!("vertex {i} has a non-finite position"));
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    self.positions.len()
                ));
            }
        }
        let count = self.positions.len();
        for (t, tri) in self.indices.iter().enumerate() {
            if let Some(&v) = tri.iter().find(|&&v| v as usize >= count) {
                return Err(format!(
                    "triangle {t} references vertex {v} of {count}"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: None,
            indices: vec![[0, 1, 2]],
        }
    }

    #[test]
    fn valid_triangle() {
        let mesh = triangle();
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.triangle_count(), 1);
        let bounds = mesh.bounds();
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 0.0));
        assert!(mesh.triangle_normals(0).is_none());
    }

    #[test]
    fn out_of_range_index() {
        let mut mesh = triangle();
        mesh.indices.push([0, 1, 3]);
        let reason = mesh.validate().unwrap_err();
        assert!(reason.contains("vertex 3"), "{reason}");
    }

    #[test]
    fn non_finite_position() {
        let mut mesh = triangle();
        mesh.positions[1][2] = f32::NAN;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn empty_mesh_is_invalid() {
        assert!(MeshData::default().validate().is_err());
    }

    #[test]
    fn normal_count_must_match() {
        let mut mesh = triangle();
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]]);
        assert!(mesh.validate().is_err());
    }
}
