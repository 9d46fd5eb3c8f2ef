//! Mesh sources and the `.mesh` file format.
//!
//! A `.mesh` file is a zstd-compressed CBOR document holding a format
//! version and the [`MeshData`].

use crate::mesh::{MeshData, MeshError};
use crate::primitives;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Paths starting with this prefix name a procedural primitive.
pub const PRIMITIVE_PREFIX: &str = "primitive:";

const MESH_FORMAT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

/// Resolves the geometry behind a mesh entity's path.
pub trait MeshSource: Send + Sync {
    /// Load and validate the mesh at `path`.
    fn load(&self, path: &Path) -> Result<MeshData, MeshError>;
}

/// Loads `.mesh` files from disk and `primitive:` paths from the
/// procedural generators. Relative paths resolve against `base_dir`.
#[derive(Debug, Clone, Default)]
pub struct FileMeshSource {
    base_dir: PathBuf,
}

impl FileMeshSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl MeshSource for FileMeshSource {
    fn load(&self, path: &Path) -> Result<MeshData, MeshError> {
        if let Some(name) = path.to_str().and_then(|s| s.strip_prefix(PRIMITIVE_PREFIX)) {
            return primitives::primitive(name)
                .ok_or_else(|| MeshError::UnknownPrimitive(name.to_string()));
        }
        read_mesh(self.resolve(path))
    }
}

#[derive(Serialize, Deserialize)]
struct MeshFile {
    version: u32,
    mesh: MeshData,
}

/// Write `mesh` as a `.mesh` file.
pub fn write_mesh(path: impl AsRef<Path>, mesh: &MeshData) -> Result<(), MeshError> {
    let path = path.as_ref();
    let io_err = |source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = MeshFile {
        version: MESH_FORMAT_VERSION,
        mesh: mesh.clone(),
    };
    let mut cbor = Vec::new();
    ciborium::into_writer(&file, &mut cbor).map_err(|e| MeshError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut encoder = zstd::Encoder::new(Vec::new(), ZSTD_LEVEL).map_err(io_err)?;
    encoder.write_all(&cbor).map_err(io_err)?;
    let compressed = encoder.finish().map_err(io_err)?;
    std::fs::write(path, compressed).map_err(io_err)?;
    tracing::debug!(path = %path.display(), triangles = mesh.triangle_count(), "mesh written");
    Ok(())
}

/// Read and validate a `.mesh` file.
pub fn read_mesh(path: impl AsRef<Path>) -> Result<MeshData, MeshError> {
    let path = path.as_ref();
    let io_err = |source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    };
    let compressed = std::fs::read(path).map_err(io_err)?;
    let mut decoder = zstd::Decoder::new(compressed.as_slice()).map_err(io_err)?;
    let mut cbor = Vec::new();
    decoder.read_to_end(&mut cbor).map_err(|e| MeshError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let file: MeshFile = ciborium::from_reader(cbor.as_slice()).map_err(|e| MeshError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if file.version != MESH_FORMAT_VERSION {
        return Err(MeshError::UnsupportedVersion {
            path: path.to_path_buf(),
            version: file.version,
            expected: MESH_FORMAT_VERSION,
        });
    }
    file.mesh.validate().map_err(|reason| MeshError::Malformed {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(file.mesh)
}
