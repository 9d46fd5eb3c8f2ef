use crate::shader::ShaderType;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registration entry point of a plugin module.
pub type PluginEntry = fn(&mut ShaderTypeRegistrar) -> Result<(), String>;

/// Errors from plugin loading and shader type resolution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    #[error("failed to load plugin '{plugin}': {reason}")]
    PluginLoad { plugin: String, reason: String },
    #[error("shader type '{0}' not found; open the plugin that provides it first")]
    ShaderTypeNotFound(String),
}

/// Collects the shader types a plugin registers while its entry point runs.
#[derive(Debug, Default)]
pub struct ShaderTypeRegistrar {
    types: Vec<Arc<dyn ShaderType>>,
}

impl ShaderTypeRegistrar {
    pub fn register(&mut self, shader_type: impl ShaderType + 'static) {
        self.types.push(Arc::new(shader_type));
    }
}

/// Name → entry point table of the plugin modules that can be opened.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    entries: BTreeMap<String, PluginEntry>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a module.
    pub fn insert(&mut self, name: impl Into<String>, entry: PluginEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<PluginEntry> {
        self.entries.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Loads plugin modules by name and resolves the shader types they provide.
///
/// Opening is all-or-nothing: a module whose entry point fails, registers
/// nothing, or clashes with an already registered type name leaves the
/// registry unchanged.
#[derive(Debug)]
pub struct PluginRegistry {
    catalog: PluginCatalog,
    /// Opened plugin → names of the types it registered.
    loaded: BTreeMap<String, Vec<String>>,
    types: BTreeMap<String, Arc<dyn ShaderType>>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_catalog(crate::builtin::catalog())
    }
}

impl PluginRegistry {
    /// Registry over the built-in plugin catalog. Nothing is opened yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            loaded: BTreeMap::new(),
            types: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// Open a plugin module and register its shader types.
    /// Opening an already opened plugin is a no-op.
    pub fn open(&mut self, name: &str) -> Result<(), PluginError> {
        if self.loaded.contains_key(name) {
            tracing::debug!(plugin = name, "plugin already open");
            return Ok(());
        }
        let load_error = |reason: String| PluginError::PluginLoad {
            plugin: name.to_string(),
            reason,
        };

        let entry = self
            .catalog
            .get(name)
            .ok_or_else(|| load_error("no such plugin module".into()))?;

        let mut registrar = ShaderTypeRegistrar::default();
        entry(&mut registrar).map_err(|e| load_error(format!("registration failed: {e}")))?;

        if registrar.types.is_empty() {
            return Err(load_error("plugin registered no shader types".into()));
        }
        let mut names = Vec::with_capacity(registrar.types.len());
        for ty in &registrar.types {
            let type_name = ty.name().to_string();
            if self.types.contains_key(&type_name) || names.contains(&type_name) {
                return Err(load_error(format!(
                    "shader type '{type_name}' is already registered"
                )));
            }
            names.push(type_name);
        }

        for (type_name, ty) in names.iter().zip(registrar.types) {
            self.types.insert(type_name.clone(), ty);
        }
        tracing::info!(plugin = name, types = ?names, "plugin opened");
        self.loaded.insert(name.to_string(), names);
        Ok(())
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Look up a registered shader type by name.
    pub fn resolve_type(&self, type_name: &str) -> Result<Arc<dyn ShaderType>, PluginError> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| PluginError::ShaderTypeNotFound(type_name.to_string()))
    }

    /// Opened plugins with the types each registered.
    pub fn loaded_plugins(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.loaded.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn shader_types(&self) -> impl Iterator<Item = &Arc<dyn ShaderType>> {
        self.types.values()
    }
}
