//! Cleanup command - review AI-proposed fixes for a guild export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use guildsmith_cleanup::{
    Advisor, AnalysisDepth, CleanupEngine, CleanupPlan, CleanupSettings, Decision, FixedAdvisor,
    FocusArea, LaunchOutcome, LaunchRequest, Prompt, SessionId, SessionReport,
};
use guildsmith_config::Config;
use guildsmith_core::{
    GuildState, UserId, baseline_bot_capabilities, require_admin, require_capabilities,
    require_guild,
};
use guildsmith_llm::{LlmAdvisor, OpenAiProvider, RetryingProvider};

use crate::config_bridge;
use crate::guild_file::FileGuild;
use crate::terminal::{TerminalEvent, TerminalPresenter, read_decision};
use crate::theme::Theme;

/// Arguments for `guildsmith cleanup`.
#[derive(Debug)]
pub(crate) struct CleanupArgs {
    pub(crate) guild: PathBuf,
    pub(crate) as_user: Option<String>,
    pub(crate) depth: Option<AnalysisDepth>,
    pub(crate) focus: FocusArea,
    pub(crate) plan: Option<PathBuf>,
    pub(crate) save: bool,
}

/// Run one approval session against a guild export.
pub(crate) async fn run_cleanup(args: CleanupArgs, config: &Config) -> anyhow::Result<()> {
    let guild = Arc::new(FileGuild::load(&args.guild)?);
    let profile = guild.profile().await?;
    let owner = args
        .as_user
        .map_or_else(|| profile.owner_id.clone(), UserId::new);

    let invoker = guild.invoker(&owner);
    require_guild(&invoker)?;
    require_admin(&invoker)?;
    require_capabilities(&guild.bot_capabilities().await?, &baseline_bot_capabilities())?;

    let settings = config_bridge::to_cleanup_settings(config);
    let advisor: Box<dyn Advisor> = match &args.plan {
        Some(path) => Box::new(FixedAdvisor::new(load_plan(path)?)),
        None => Box::new(llm_advisor(config, &settings)?),
    };

    let (tx, mut events) = mpsc::unbounded_channel();
    let engine = CleanupEngine::new(Arc::new(TerminalPresenter::new(tx)), settings);
    let depth = args
        .depth
        .unwrap_or_else(|| config_bridge::default_depth(config));
    let request = LaunchRequest::new(owner.clone(), format!("cli-{}", std::process::id()))
        .with_depth(depth)
        .with_focus(args.focus);

    println!(
        "{}",
        Theme::info(&format!("Analyzing {} ({depth} analysis)...", profile.name))
    );
    let state: Arc<dyn GuildState> = guild.clone();
    let id = match engine.launch(state, &*advisor, request).await? {
        LaunchOutcome::Started(id) => id,
        LaunchOutcome::NoIssues { .. } => return Ok(()),
        LaunchOutcome::AdvisoryFailed(reason) => anyhow::bail!("cleanup analysis failed: {reason}"),
    };

    let report = drive(&engine, &id, &owner, &mut events).await?;
    if report.applied_count() == 0 {
        return Ok(());
    }
    if args.save {
        guild.save(&args.guild)?;
        println!(
            "{}",
            Theme::success(&format!("Saved changes to {}", args.guild.display()))
        );
    } else {
        println!(
            "{}",
            Theme::dimmed("Changes were not saved. Re-run with --save to write them back.")
        );
    }
    Ok(())
}

/// Read a saved plan in the same JSON shape the model returns.
fn load_plan(path: &Path) -> anyhow::Result<CleanupPlan> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan {}", path.display()))?;
    let plan = CleanupPlan::from_llm_text(&raw)
        .with_context(|| format!("{} is not a cleanup plan", path.display()))?;
    Ok(plan)
}

fn llm_advisor(
    config: &Config,
    settings: &CleanupSettings,
) -> anyhow::Result<LlmAdvisor<RetryingProvider<OpenAiProvider>>> {
    let provider = OpenAiProvider::new(config_bridge::to_provider_config(config))?;
    let provider = RetryingProvider::new(provider, config_bridge::to_retry_policy(config));
    Ok(LlmAdvisor::new(provider)
        .with_protected(settings.protected.clone())
        .with_timeout(settings.advisory_timeout))
}

/// Answer prompts until the session reports.
async fn drive(
    engine: &CleanupEngine,
    id: &SessionId,
    owner: &UserId,
    events: &mut mpsc::UnboundedReceiver<TerminalEvent>,
) -> anyhow::Result<SessionReport> {
    while let Some(event) = events.recv().await {
        match event {
            TerminalEvent::Prompt(prompt) => {
                ask_on_thread(engine.clone(), id.clone(), owner.clone(), prompt);
            },
            TerminalEvent::Finished(report) => return Ok(report),
        }
    }
    engine
        .wait_for_completion(id)
        .await
        .with_context(|| format!("cleanup session {id} vanished"))
}

/// The terminal read blocks, and may outlive the session if it times out,
/// so it runs on its own thread rather than on the runtime.
fn ask_on_thread(engine: CleanupEngine, id: SessionId, owner: UserId, prompt: Prompt) {
    std::thread::spawn(move || {
        let decision = read_decision(&prompt.available_decisions).unwrap_or(Decision::Abort);
        if let Err(rejection) = engine.submit_decision(&id, &owner, decision) {
            tracing::warn!(session = %id, %rejection, "Decision not accepted");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_plan_accepts_fenced_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            "```json\n{\"issues\": [{\"type\": \"naming_inconsistency\", \"severity\": \"low\", \
             \"description\": \"Spaces in names\", \"affected_items\": [\"off topic\"], \
             \"auto_fixable\": true}]}\n```",
        )
        .unwrap();
        let plan = load_plan(&path).unwrap();
        assert_eq!(plan.proposals.len(), 1);
    }

    #[test]
    fn test_load_plan_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "not a plan").unwrap();
        let err = load_plan(&path).unwrap_err();
        assert!(err.to_string().contains("is not a cleanup plan"));
    }
}
