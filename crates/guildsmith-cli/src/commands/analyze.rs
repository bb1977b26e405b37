//! Analyze command - print what the advisor would be shown.

use std::path::Path;

use guildsmith_cleanup::{AnalysisDepth, FixApplier, FocusArea, GuildSnapshot, SafetyGate};
use guildsmith_config::Config;

use crate::config_bridge;
use crate::guild_file::FileGuild;

/// Capture a snapshot of a guild export and print it as JSON.
pub(crate) async fn run_analyze(
    guild_path: &Path,
    depth: Option<AnalysisDepth>,
    focus: FocusArea,
    config: &Config,
) -> anyhow::Result<()> {
    let guild = FileGuild::load(guild_path)?;
    let settings = config_bridge::to_cleanup_settings(config);
    let applier = FixApplier::new(SafetyGate::new(settings.protected))
        .with_separator(settings.name_separator);
    let depth = depth.unwrap_or_else(|| config_bridge::default_depth(config));

    let snapshot = GuildSnapshot::capture(&guild, &applier, depth, focus).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
