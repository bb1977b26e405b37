//! The model-backed cleanup advisor.

use async_trait::async_trait;
use guildsmith_cleanup::{
    Advisor, AdvisoryError, AdvisoryResult, CleanupPlan, GuildSnapshot, ProtectedNames,
};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{info, warn};

use crate::provider::LlmProvider;

/// Overall time the advisor gives the model, retries included.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The system prompt: conservative rules, protected keywords, and the
/// reply schema.
#[must_use]
pub fn system_prompt(protected: &ProtectedNames) -> String {
    let mut prompt = String::from(
        "Analyze Discord server structure. Return JSON with CONSERVATIVE, SAFE recommendations.\n",
    );
    let _ = writeln!(
        prompt,
        "CRITICAL: NEVER suggest moving/deleting these protected channels: {}.",
        protected.keywords().join(", ")
    );
    prompt.push_str(
        r#"
{
    "issues": [
        {
            "type": "permission_redundancy|naming_inconsistency",
            "severity": "low|medium",
            "description": "Brief 1-line issue description",
            "current_state": "What's wrong",
            "proposed_solution": "Safe, minimal change",
            "affected_items": ["exact channel/role names - VERIFY THESE EXIST"],
            "auto_fixable": true/false
        }
    ],
    "optimization_suggestions": [
        {
            "category": "structure|permissions|naming",
            "suggestion": "Conservative suggestion",
            "benefits": "Why this helps",
            "requires_confirmation": true/false
        }
    ]
}

RULES:
- Only suggest renaming channels with spaces to use dashes
- Only suggest removing redundant permission overwrites (not actual permissions)
- NEVER suggest deleting or moving important channels
- NEVER suggest role deletions or major permission changes
- Be extremely conservative - when in doubt, don't suggest the fix"#,
    );
    prompt
}

/// The user prompt: the snapshot as pretty JSON plus its framing.
///
/// # Errors
///
/// Returns [`AdvisoryError::Provider`] if the snapshot cannot be serialised.
pub fn user_prompt(snapshot: &GuildSnapshot) -> AdvisoryResult<String> {
    let data = serde_json::to_string_pretty(snapshot)
        .map_err(|e| AdvisoryError::Provider(format!("failed to encode snapshot: {e}")))?;
    Ok(format!(
        "Server: {}\nAnalysis Depth: {}\nFocus Area: {}\nData: {data}\n\n\
         Identify specific issues and provide actionable recommendations.",
        snapshot.server_name, snapshot.depth, snapshot.focus
    ))
}

/// Asks a model for a cleanup plan.
#[derive(Debug)]
pub struct LlmAdvisor<P> {
    provider: P,
    protected: ProtectedNames,
    timeout: Duration,
}

impl<P: LlmProvider> LlmAdvisor<P> {
    /// Create an advisor with the default protected keywords and a 30 s limit.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            protected: ProtectedNames::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builder: the keywords listed in the system prompt.
    #[must_use]
    pub fn with_protected(mut self, protected: ProtectedNames) -> Self {
        self.protected = protected;
        self
    }

    /// Builder: the overall time limit.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<P: LlmProvider> Advisor for LlmAdvisor<P> {
    async fn advise(&self, snapshot: &GuildSnapshot) -> AdvisoryResult<CleanupPlan> {
        let system = system_prompt(&self.protected);
        let prompt = user_prompt(snapshot)?;

        let reply = tokio::time::timeout(self.timeout, self.provider.complete(&system, &prompt))
            .await
            .map_err(|_| AdvisoryError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| AdvisoryError::Provider(e.to_string()))?;

        let plan = CleanupPlan::from_llm_text(&reply).inspect_err(|e| {
            warn!(model = self.provider.model(), error = %e, "Model reply is not a cleanup plan");
        })?;
        info!(
            model = self.provider.model(),
            issues = plan.proposals.len(),
            dropped = plan.dropped,
            "Cleanup plan generated"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, LlmResult};
    use guildsmith_cleanup::{AnalysisDepth, FixApplier, FocusArea, ProposalKind};
    use guildsmith_test::MockGuild;
    use std::sync::Mutex;

    struct Canned {
        reply: Option<String>,
        delay: Duration,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Canned {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn model(&self) -> &'static str {
            "canned-model"
        }

        async fn complete(&self, system: &str, prompt: &str) -> LlmResult<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string()));
            tokio::time::sleep(self.delay).await;
            self.reply.clone().ok_or(LlmError::EmptyResponse)
        }
    }

    async fn snapshot() -> GuildSnapshot {
        let guild = MockGuild::new()
            .with_text_channel("my channel")
            .with_text_channel("general");
        GuildSnapshot::capture(
            &guild,
            &FixApplier::default(),
            AnalysisDepth::Comprehensive,
            FocusArea::Naming,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_system_prompt_lists_keywords() {
        let prompt = system_prompt(&ProtectedNames::new(["vault", "mod"]));
        assert!(prompt.contains("protected channels: vault, mod."));
        assert!(prompt.contains("naming_inconsistency"));
    }

    #[tokio::test]
    async fn test_user_prompt_hides_protected() {
        let prompt = user_prompt(&snapshot().await).unwrap();
        assert!(prompt.starts_with(
            "Server: Test Guild\nAnalysis Depth: comprehensive\nFocus Area: naming"
        ));
        assert!(prompt.contains("my channel"));
        assert!(!prompt.contains("\"general\""));
    }

    #[tokio::test]
    async fn test_advise_parses_reply() {
        let provider = Canned::replying(
            r#"```json
{"issues":[{"type":"naming_inconsistency","severity":"low","description":"Spaces","affected_items":["my channel"]}]}
```"#,
        );
        let advisor = LlmAdvisor::new(provider);
        let plan = advisor.advise(&snapshot().await).await.unwrap();
        assert_eq!(plan.proposals.len(), 1);
        assert_eq!(plan.proposals[0].kind, ProposalKind::NamingInconsistency);
        assert_eq!(advisor.provider.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_advise_malformed() {
        let advisor = LlmAdvisor::new(Canned::replying("Sorry, I cannot help."));
        let err = advisor.advise(&snapshot().await).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_advise_provider_failure() {
        let mut provider = Canned::replying("");
        provider.reply = None;
        let err = LlmAdvisor::new(provider)
            .advise(&snapshot().await)
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisoryError::Provider(ref msg) if msg.contains("Empty response")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_advise_timeout() {
        let mut provider = Canned::replying("{}");
        provider.delay = Duration::from_secs(90);
        let err = LlmAdvisor::new(provider)
            .with_timeout(Duration::from_secs(5))
            .advise(&snapshot().await)
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisoryError::Timeout { timeout_secs: 5 }));
    }
}
