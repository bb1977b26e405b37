//! The merged configuration together with where each value came from.

use crate::error::ConfigResult;
use crate::merge::{ConfigLayer, FieldSources};
use crate::types::Config;

/// A loaded configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Layer that supplied each dotted field path.
    pub field_sources: FieldSources,
    /// Config files that were found and merged, lowest precedence first.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Layer that supplied `field` (e.g. `"cleanup.step_timeout_secs"`).
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<ConfigLayer> {
        self.field_sources.get(field).copied()
    }

    /// Render the effective configuration as TOML.
    ///
    /// Credentials are never written out.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RenderError`](crate::ConfigError::RenderError)
    /// if serialization fails.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(&self.config)?)
    }

    /// Lines of `field = layer`, sorted by field, for display.
    #[must_use]
    pub fn provenance_lines(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &ConfigLayer)> = self.field_sources.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(field, layer)| format!("{field} = {layer}"))
            .collect()
    }
}
