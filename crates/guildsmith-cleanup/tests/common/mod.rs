//! Shared harness for cleanup integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use guildsmith_cleanup::{
    Advisor, AdvisoryError, AdvisoryResult, ChangeProposal, CleanupEngine, CleanupPlan,
    CleanupPresenter, CleanupSettings, FixReport, GuildSnapshot, Prompt, ProposalKind,
    RenderRequest, SessionId, SessionReport,
};
use guildsmith_core::{
    CapabilitySet, Channel, ChannelId, GuildId, GuildProfile, GuildState, MessageSummary,
    OverwriteTarget, PermissionOverwrite, PlatformResult, Role, RoleId,
};
use guildsmith_test::MockGuild;
use tokio::sync::{Notify, mpsc};

/// Presenter that forwards every request to a channel.
pub struct RecordingPresenter {
    tx: mpsc::UnboundedSender<(SessionId, RenderRequest)>,
}

#[async_trait]
impl CleanupPresenter for RecordingPresenter {
    async fn present(&self, session: &SessionId, request: RenderRequest) {
        let _ = self.tx.send((session.clone(), request));
    }
}

/// The receiving side of a [`RecordingPresenter`].
pub struct Screens {
    rx: mpsc::UnboundedReceiver<(SessionId, RenderRequest)>,
    /// Everything received so far, in order.
    pub seen: Vec<RenderRequest>,
}

impl Screens {
    /// Next request of any kind.
    pub async fn next(&mut self) -> RenderRequest {
        self.next_tagged().await.1
    }

    /// Next request together with the session it belongs to.
    pub async fn next_tagged(&mut self) -> (SessionId, RenderRequest) {
        let (session, request) = self.rx.recv().await.expect("presenter dropped");
        self.seen.push(request.clone());
        (session, request)
    }

    /// A request that has already been sent, if any.
    pub fn try_next(&mut self) -> Option<RenderRequest> {
        let (_, request) = self.rx.try_recv().ok()?;
        self.seen.push(request.clone());
        Some(request)
    }

    /// Skip ahead to the next prompt.
    pub async fn next_prompt(&mut self) -> Prompt {
        loop {
            if let RenderRequest::Prompt(prompt) = self.next().await {
                return prompt;
            }
        }
    }

    /// Skip ahead to the next fix result.
    pub async fn next_fix(&mut self) -> FixReport {
        loop {
            if let RenderRequest::FixResult { report, .. } = self.next().await {
                return report;
            }
        }
    }

    /// Skip ahead to the final summary.
    pub async fn summary(&mut self) -> SessionReport {
        loop {
            if let RenderRequest::Summary(report) = self.next().await {
                return report;
            }
        }
    }

    /// Number of prompts seen so far.
    pub fn prompt_count(&self) -> usize {
        self.seen
            .iter()
            .filter(|r| matches!(r, RenderRequest::Prompt(_)))
            .count()
    }
}

/// An engine wired to a recording presenter.
pub fn engine(settings: CleanupSettings) -> (CleanupEngine, Screens) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = CleanupEngine::new(Arc::new(RecordingPresenter { tx }), settings);
    (
        engine,
        Screens {
            rx,
            seen: Vec::new(),
        },
    )
}

/// Settings that open sessions directly on the first proposal.
pub fn direct() -> CleanupSettings {
    CleanupSettings::default().with_confirm_start(false)
}

/// One naming proposal per item.
pub fn naming_plan(items: &[&str]) -> CleanupPlan {
    CleanupPlan::new(
        items
            .iter()
            .map(|item| {
                ChangeProposal::new(
                    ProposalKind::NamingInconsistency,
                    format!("Normalize \"{item}\""),
                )
                .with_affected_items([*item])
            })
            .collect(),
    )
}

enum Answer {
    Plan(CleanupPlan),
    Text(String),
    Fail(String),
}

/// Advisor returning a canned answer after an optional delay.
pub struct ScriptedAdvisor {
    delay: Option<Duration>,
    answer: Answer,
}

impl ScriptedAdvisor {
    /// Answer with a plan.
    pub fn plan(plan: CleanupPlan) -> Self {
        Self {
            delay: None,
            answer: Answer::Plan(plan),
        }
    }

    /// Answer with raw model text, parsed like a real reply.
    pub fn text(text: &str) -> Self {
        Self {
            delay: None,
            answer: Answer::Text(text.to_string()),
        }
    }

    /// Fail as a provider would.
    pub fn failing(message: &str) -> Self {
        Self {
            delay: None,
            answer: Answer::Fail(message.to_string()),
        }
    }

    /// Answer only after `delay`.
    pub fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            answer: Answer::Plan(CleanupPlan::default()),
        }
    }
}

#[async_trait]
impl Advisor for ScriptedAdvisor {
    async fn advise(&self, _snapshot: &GuildSnapshot) -> AdvisoryResult<CleanupPlan> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.answer {
            Answer::Plan(plan) => Ok(plan.clone()),
            Answer::Text(text) => Ok(CleanupPlan::from_llm_text(text)?),
            Answer::Fail(message) => Err(AdvisoryError::Provider(message.clone())),
        }
    }
}

/// A guild whose channel renames take `delay` to complete.
pub struct SlowRenames {
    inner: MockGuild,
    delay: Duration,
    /// Signalled when a rename begins.
    pub rename_started: Arc<Notify>,
}

impl SlowRenames {
    /// Wrap a mock guild.
    pub fn new(inner: MockGuild, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            rename_started: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl GuildState for SlowRenames {
    fn guild_id(&self) -> &GuildId {
        self.inner.guild_id()
    }

    async fn profile(&self) -> PlatformResult<GuildProfile> {
        self.inner.profile().await
    }

    async fn channels(&self) -> PlatformResult<Vec<Channel>> {
        self.inner.channels().await
    }

    async fn roles(&self) -> PlatformResult<Vec<Role>> {
        self.inner.roles().await
    }

    async fn everyone_role(&self) -> PlatformResult<Role> {
        self.inner.everyone_role().await
    }

    async fn bot_capabilities(&self) -> PlatformResult<CapabilitySet> {
        self.inner.bot_capabilities().await
    }

    async fn bot_channel_capabilities(
        &self,
        channel: &ChannelId,
    ) -> PlatformResult<CapabilitySet> {
        self.inner.bot_channel_capabilities(channel).await
    }

    async fn recent_messages(
        &self,
        channel: &ChannelId,
        limit: usize,
    ) -> PlatformResult<Vec<MessageSummary>> {
        self.inner.recent_messages(channel, limit).await
    }

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> PlatformResult<()> {
        self.rename_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.rename_channel(channel, name).await
    }

    async fn rename_role(&self, role: &RoleId, name: &str) -> PlatformResult<()> {
        self.inner.rename_role(role, name).await
    }

    async fn set_channel_overwrite(
        &self,
        channel: &ChannelId,
        target: &OverwriteTarget,
        overwrite: Option<PermissionOverwrite>,
    ) -> PlatformResult<()> {
        self.inner
            .set_channel_overwrite(channel, target, overwrite)
            .await
    }
}
