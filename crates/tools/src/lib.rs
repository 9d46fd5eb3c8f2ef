//! Developer tooling: read-only scene inspection for the CLI and debugging.

pub mod inspector;

pub use inspector::{EntityInfo, SceneInspector, SceneSummary};
