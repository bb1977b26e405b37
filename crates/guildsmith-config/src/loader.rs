//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.guildsmith/config.toml` (or `$GUILDSMITH_HOME/config.toml`)
//! 3. Merge `{workspace}/.guildsmith/config.toml`
//! 4. Apply env var fallbacks for unset fields
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Name of the per-user and per-workspace config directory.
const CONFIG_DIR: &str = ".guildsmith";

/// Load the configuration with layered file precedence.
///
/// `home_override` is treated as the guildsmith home directory itself
/// (the directory holding `config.toml`), bypassing discovery.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    load_with_env(workspace_root, home_override, &collect_env_vars())
}

/// [`load`] with an explicit environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", ConfigLayer::Defaults, &mut field_sources);

    let user_path = match home_override {
        Some(home) => Some(home.join("config.toml")),
        None => user_config_path(env_vars)?,
    };
    if let Some(path) = user_path
        && let Some(overlay) = try_load_file(&path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", ConfigLayer::User, &mut field_sources);
        info!(path = %path.display(), "loaded user config");
        loaded_files.push(path.display().to_string());
    }

    if let Some(root) = workspace_root {
        let path = root.join(CONFIG_DIR).join("config.toml");
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge_tracking(
                &mut merged,
                &overlay,
                "",
                ConfigLayer::Workspace,
                &mut field_sources,
            );
            info!(path = %path.display(), "loaded workspace config");
            loaded_files.push(path.display().to_string());
        }
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let Some(value) = try_load_file(path)? else {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    };
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// `~/.guildsmith/config.toml` if it exists, else `$GUILDSMITH_HOME/config.toml`.
fn user_config_path<S: ::std::hash::BuildHasher>(
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Option<PathBuf>> {
    let home = home_directory()?;
    let default_path = home.join(CONFIG_DIR).join("config.toml");
    if default_path.is_file() {
        return Ok(Some(default_path));
    }
    let Some(raw) = env_vars.get("GUILDSMITH_HOME") else {
        return Ok(None);
    };
    match PathBuf::from(raw).canonicalize() {
        Ok(dir) if dir.is_dir() => Ok(Some(dir.join("config.toml"))),
        _ => {
            warn!(path = %raw, "GUILDSMITH_HOME is not a directory; ignoring");
            Ok(None)
        },
    }
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Reads once and checks the size afterwards, so there is no window between
/// a stat and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.model.max_attempts, 3);
        assert_eq!(config.cleanup.step_timeout_secs, 120);
        assert_eq!(config.protection.keywords.len(), 12);
        assert_eq!(
            config.protection.keywords,
            crate::types::ProtectionSection::default().keywords
        );
    }

    #[test]
    fn test_layers_and_env() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[model]\nmodel = \"gpt-4o\"\n[cleanup]\nstep_timeout_secs = 60\n",
        )
        .unwrap();
        std::fs::create_dir(workspace.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            workspace.path().join(CONFIG_DIR).join("config.toml"),
            "[cleanup]\nstep_timeout_secs = 45\n",
        )
        .unwrap();

        let env: HashMap<String, String> = [("OPENAI_API_KEY".to_owned(), "sk-env".to_owned())]
            .into_iter()
            .collect();
        let resolved = load_with_env(Some(workspace.path()), Some(home.path()), &env).unwrap();

        assert_eq!(resolved.config.model.model, "gpt-4o");
        assert_eq!(resolved.config.cleanup.step_timeout_secs, 45);
        assert_eq!(resolved.config.cleanup.overview_timeout_secs, 300);
        assert_eq!(resolved.config.model.api_key.as_deref(), Some("sk-env"));
        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(
            resolved.field_sources.get("cleanup.step_timeout_secs"),
            Some(&ConfigLayer::Workspace)
        );
    }

    #[test]
    fn test_invalid_layer_rejected() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[cleanup]\nname_separator = \"--\"\n",
        )
        .unwrap();
        let result = load_with_env(None, Some(home.path()), &no_env());
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "cleanup.name_separator"
        ));
    }

    #[test]
    fn test_malformed_file() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[model\n").unwrap();
        let result = load_with_env(None, Some(home.path()), &no_env());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_load_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nformat = \"json\"\n").unwrap();
        let config = load_file(&path).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }
}
