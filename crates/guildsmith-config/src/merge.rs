use std::collections::HashMap;
use std::fmt;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigLayer {
    /// The embedded defaults.
    Defaults,
    /// The user config file.
    User,
    /// The workspace config file.
    Workspace,
    /// An environment variable fallback.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Defaults => "defaults",
            Self::User => "user",
            Self::Workspace => "workspace",
            Self::Environment => "env",
        })
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording which layer set each leaf.
///
/// Tables merge key by key; every other value (arrays included) replaces.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Mark every leaf under `val` as set by `layer`.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_merge_tables_and_track() {
        let mut base = parse("[model]\nmodel = \"a\"\nmax_tokens = 10\n");
        let mut sources = FieldSources::new();
        record_leaves(&base, "", ConfigLayer::Defaults, &mut sources);

        let overlay = parse("[model]\nmodel = \"b\"\n[logging]\nlevel = \"debug\"\n");
        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::User, &mut sources);

        assert_eq!(base["model"]["model"].as_str(), Some("b"));
        assert_eq!(base["model"]["max_tokens"].as_integer(), Some(10));
        assert_eq!(sources.get("model.model"), Some(&ConfigLayer::User));
        assert_eq!(sources.get("model.max_tokens"), Some(&ConfigLayer::Defaults));
        assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::User));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("keywords = [\"a\", \"b\"]");
        let overlay = parse("keywords = [\"c\"]");
        deep_merge_tracking(
            &mut base,
            &overlay,
            "",
            ConfigLayer::Workspace,
            &mut FieldSources::new(),
        );
        assert_eq!(base["keywords"].as_array().map(Vec::len), Some(1));
    }
}
