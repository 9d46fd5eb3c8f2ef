use crate::mesh::{MeshData, MeshError};
use crate::source::MeshSource;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Content-addressed mesh ID computed from the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

impl MeshId {
    pub fn of(mesh: &MeshData) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((mesh.positions.len() as u64).to_le_bytes());
        hasher.update(bytemuck::cast_slice::<[f32; 3], u8>(&mesh.positions));
        match &mesh.normals {
            Some(normals) => {
                hasher.update([1u8]);
                hasher.update(bytemuck::cast_slice::<[f32; 3], u8>(normals));
            }
            None => hasher.update([0u8]),
        }
        hasher.update(bytemuck::cast_slice::<[u32; 3], u8>(&mesh.indices));
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[..8]);
        Self(u64::from_le_bytes(bytes))
    }
}

/// Meshes loaded through a [`MeshSource`], deduplicated by path and by content.
///
/// Each path is loaded at most once. Two paths with identical geometry share
/// one [`MeshId`].
#[derive(Debug, Default)]
pub struct MeshStore {
    meshes: BTreeMap<MeshId, Arc<MeshData>>,
    by_path: HashMap<PathBuf, MeshId>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate `path` through `source` unless it was loaded before.
    pub fn load(&mut self, source: &dyn MeshSource, path: &Path) -> Result<MeshId, MeshError> {
        if let Some(&id) = self.by_path.get(path) {
            return Ok(id);
        }
        let mesh = source.load(path)?;
        mesh.validate().map_err(|reason| MeshError::Malformed {
            path: path.to_path_buf(),
            reason,
        })?;
        let id = self.insert(mesh);
        self.by_path.insert(path.to_path_buf(), id);
        tracing::debug!(path = %path.display(), id = id.0, "mesh loaded");
        Ok(id)
    }

    /// Store `mesh` and return its ID. Identical content is stored once.
    pub fn insert(&mut self, mesh: MeshData) -> MeshId {
        let id = MeshId::of(&mesh);
        self.meshes.entry(id).or_insert_with(|| Arc::new(mesh));
        id
    }

    pub fn get(&self, id: MeshId) -> Option<&Arc<MeshData>> {
        self.meshes.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &Arc<MeshData>)> {
        self.meshes.iter().map(|(&id, mesh)| (id, mesh))
    }

    /// Number of distinct meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        loads: AtomicUsize,
    }

    impl MeshSource for CountingSource {
        fn load(&self, path: &Path) -> Result<MeshData, MeshError> {
            self.loads.fetch_add(1, Ordering::Relaxed);
            match path.to_str() {
                Some("a") | Some("b") => Ok(primitives::quad()),
                Some("c") => Ok(primitives::cube()),
                Some("empty") => Ok(MeshData::default()),
                _ => Err(MeshError::UnknownPrimitive(path.display().to_string())),
            }
        }
    }

    #[test]
    fn content_addressed_dedup() {
        assert_eq!(
            MeshId::of(&primitives::quad()),
            MeshId::of(&primitives::quad())
        );
        assert_ne!(
            MeshId::of(&primitives::quad()),
            MeshId::of(&primitives::plane())
        );
    }

    #[test]
    fn each_path_loaded_once() {
        let source = CountingSource::default();
        let mut store = MeshStore::new();
        let a1 = store.load(&source, Path::new("a")).unwrap();
        let a2 = store.load(&source, Path::new("a")).unwrap();
        let b = store.load(&source, Path::new("b")).unwrap();
        let c = store.load(&source, Path::new("c")).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(a1, b);
        assert_ne!(a1, c);
        assert_eq!(source.loads.load(Ordering::Relaxed), 3);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let source = CountingSource::default();
        let mut store = MeshStore::new();
        assert!(store.load(&source, Path::new("zzz")).is_err());
        assert!(matches!(
            store.load(&source, Path::new("empty")),
            Err(MeshError::Malformed { .. })
        ));
        assert!(store.is_empty());
    }
}
