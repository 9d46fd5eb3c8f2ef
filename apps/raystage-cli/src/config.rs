use anyhow::Context;
use raystage_render::RenderOptions;
use serde::Deserialize;
use std::path::Path;

/// Optional YAML configuration. Command-line flags override it.
///
/// ```yaml
/// log: raystage_render=debug,info
/// render:
///   threads: 4
///   band_rows: 16
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `EnvFilter` directive used when `--verbose` is not given.
    pub log: Option<String>,
    pub render: RenderOptions,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Log filter: debug when verbose, else the configured one, else info.
    pub fn log_filter(&self, verbose: bool) -> &str {
        match (verbose, &self.log) {
            (true, _) => "debug",
            (false, Some(filter)) => filter,
            (false, None) => "info",
        }
    }
}
