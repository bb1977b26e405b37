//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// Supported mappings. Earlier entries win when two map to the same field.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "GUILDSMITH_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "OPENAI_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "GUILDSMITH_API_URL",
        field_path: "model.api_url",
    },
    EnvMapping {
        var_name: "GUILDSMITH_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "GUILDSMITH_LOG",
        field_path: "logging.level",
    },
];

/// Read the environment variables this crate cares about.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("GUILDSMITH_") || k == "OPENAI_API_KEY")
        .collect()
}

/// Apply environment variable fallbacks to fields no config file set.
///
/// Values that came only from the embedded defaults can be replaced.
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let already_set = sources
            .get(mapping.field_path)
            .is_some_and(|layer| !matches!(layer, ConfigLayer::Defaults));
        if already_set {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        if set_string_field(merged, mapping.field_path, val) {
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a dotted string field, creating intermediate tables.
fn set_string_field(root: &mut toml::Value, path: &str, val: &str) -> bool {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        return false;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return false;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    match current.as_table_mut() {
        Some(table) => {
            table.insert(leaf.to_owned(), toml::Value::String(val.to_owned()));
            true
        },
        None => false,
    }
}
