//! Mesh assets: the mesh source contract consumed by the renderer, the
//! compressed `.mesh` file format, procedural primitives and a
//! content-addressed store of loaded meshes.
//!
//! # Invariants
//! - A mesh handed to the renderer has validated indices and finite positions.
//! - Load failures are errors, never empty geometry.
//! - Identical mesh content is stored once.

pub mod mesh;
pub mod primitives;
pub mod source;
pub mod store;

pub use mesh::{MeshData, MeshError};
pub use source::{FileMeshSource, MeshSource, PRIMITIVE_PREFIX, read_mesh, write_mesh};
pub use store::{MeshId, MeshStore};
