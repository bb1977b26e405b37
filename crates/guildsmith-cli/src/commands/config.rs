//! Config command - show the resolved configuration.

use colored::Colorize;
use guildsmith_config::ResolvedConfig;

use crate::theme::Theme;

/// Print the effective configuration. Credentials are never shown.
pub(crate) fn show_config(resolved: &ResolvedConfig, sources: bool) -> anyhow::Result<()> {
    if resolved.loaded_files.is_empty() {
        println!("{}", Theme::dimmed("# no config files found; showing defaults"));
    } else {
        for file in &resolved.loaded_files {
            println!("{}", Theme::dimmed(&format!("# loaded {file}")));
        }
    }
    if resolved.config.model.api_key.is_some() {
        let origin = resolved
            .source_of("model.api_key")
            .map_or_else(|| "unknown".to_string(), |layer| layer.to_string());
        println!("{}", Theme::dimmed(&format!("# api key set (from {origin})")));
    }
    println!("{}", resolved.to_toml()?);

    if sources {
        println!("{}", "Sources".bold());
        for line in resolved.provenance_lines() {
            println!("  {line}");
        }
    }
    Ok(())
}
