//! Shading: the shader type capability, the plugin registry that provides
//! shader types by name, and the built-in shader plugins.
//!
//! # Invariants
//! - A shader type is only reachable after the plugin that provides it was opened.
//! - Opening a plugin is idempotent and all-or-nothing.

pub mod builtin;
pub mod plugin;
pub mod shader;

pub use plugin::{PluginCatalog, PluginEntry, PluginError, PluginRegistry, ShaderTypeRegistrar};
pub use shader::{
    LightSample, PathDepth, Radiance, ShaderType, SurfaceHit, SurfaceShader, Tracer,
};
