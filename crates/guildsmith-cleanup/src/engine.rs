//! Cleanup engine: owns sessions and drives each one as its own task.
//!
//! # Session flow
//!
//! 1. [`CleanupEngine::start_session`] registers the session, arms the first
//!    decision slot, and spawns a driver task
//! 2. The driver presents the current screen and waits (bounded) for the
//!    owner's decision
//! 3. The decision is carried out (apply, skip, skip all, abort, or the
//!    overview decisions), state is updated, and the slot is re-armed
//! 4. On a terminal status the report is retained, the session leaves the
//!    registry, subscribers are notified, and a summary is presented
//!
//! Decisions arrive through [`CleanupEngine::submit_decision`] from any
//! task. While a fix is being applied no slot is armed, so nothing can
//! interrupt it.

use guildsmith_core::{GuildState, UserId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::advisory::{Advisor, AdvisoryError};
use crate::applier::FixApplier;
use crate::error::{CleanupError, CleanupResult, Rejection};
use crate::proposal::CleanupPlan;
use crate::registry::SessionRegistry;
use crate::render::{
    CleanupPresenter, NoticeLevel, RenderRequest, detailed_report, overview_prompt, step_prompt,
    suggestions_report,
};
use crate::report::SessionReport;
use crate::safety::SafetyGate;
use crate::session::{ApprovalSession, Decision, LiveSession, Phase, SessionId};
use crate::settings::CleanupSettings;
use crate::snapshot::{AnalysisDepth, FocusArea, GuildSnapshot};

/// Who is launching an advised cleanup, and how deep to analyse.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// The session owner.
    pub owner: UserId,
    /// The originating invocation (interaction id, command run id).
    pub invocation: String,
    /// Snapshot depth.
    pub depth: AnalysisDepth,
    /// Advisor focus.
    pub focus: FocusArea,
}

impl LaunchRequest {
    /// Create a request at the default depth and focus.
    #[must_use]
    pub fn new(owner: UserId, invocation: impl Into<String>) -> Self {
        Self {
            owner,
            invocation: invocation.into(),
            depth: AnalysisDepth::default(),
            focus: FocusArea::default(),
        }
    }

    /// Builder: set the depth.
    #[must_use]
    pub fn with_depth(mut self, depth: AnalysisDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Builder: set the focus.
    #[must_use]
    pub fn with_focus(mut self, focus: FocusArea) -> Self {
        self.focus = focus;
        self
    }

    fn session_id(&self) -> SessionId {
        SessionId::new(self.owner.clone(), self.invocation.clone())
    }
}

/// What [`CleanupEngine::launch`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A session is running.
    Started(SessionId),
    /// The advisor found nothing to fix.
    NoIssues {
        /// Informational suggestions it returned anyway.
        suggestions: usize,
    },
    /// Analysis failed; the owner has been shown a notice.
    AdvisoryFailed(String),
}

struct EngineInner {
    registry: SessionRegistry,
    applier: FixApplier,
    presenter: Arc<dyn CleanupPresenter>,
    settings: CleanupSettings,
    finished: Mutex<VecDeque<SessionReport>>,
}

/// Runs approval sessions.
///
/// Cheap to clone; clones share the registry and presenter.
#[derive(Clone)]
pub struct CleanupEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for CleanupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupEngine")
            .field("live_sessions", &self.inner.registry.ids())
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl CleanupEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(presenter: Arc<dyn CleanupPresenter>, settings: CleanupSettings) -> Self {
        let applier = FixApplier::new(SafetyGate::new(settings.protected.clone()))
            .with_separator(settings.name_separator);
        Self {
            inner: Arc::new(EngineInner {
                registry: SessionRegistry::new(),
                applier,
                presenter,
                settings,
                finished: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// The engine's settings.
    #[must_use]
    pub fn settings(&self) -> &CleanupSettings {
        &self.inner.settings
    }

    /// Number of running sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.inner.registry.len()
    }

    /// Start a session over a plan and spawn its driver.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`CleanupError::EmptyPlan`] if the plan has no proposals
    /// - [`CleanupError::Conflict`] if a session with the same owner and
    ///   invocation is still running (the running one is untouched)
    /// - [`CleanupError::Internal`] if no runtime is available
    pub fn start_session(
        &self,
        guild: Arc<dyn GuildState>,
        plan: CleanupPlan,
        owner: UserId,
        invocation: impl Into<String>,
    ) -> CleanupResult<SessionId> {
        if plan.is_empty() {
            return Err(CleanupError::EmptyPlan);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CleanupError::Internal(format!("no async runtime: {e}")))?;

        let id = SessionId::new(owner, invocation);
        let total = plan.proposals.len();
        let session = ApprovalSession::new(id.clone(), plan, self.inner.settings.confirm_start);
        let live = Arc::new(LiveSession::new(session));

        self.inner.registry.register(Arc::clone(&live))?;
        let first = live.arm();

        info!(session = %id, guild = %guild.guild_id(), total, "Cleanup session started");

        let span = info_span!("cleanup_session", session = %id, guild = %guild.guild_id());
        let inner = Arc::clone(&self.inner);
        runtime.spawn(inner.drive(guild, live, first).instrument(span));

        Ok(id)
    }

    /// Submit the owner's decision for a session.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`]; a rejected decision changes nothing.
    pub fn submit_decision(
        &self,
        session_id: &SessionId,
        actor: &UserId,
        decision: Decision,
    ) -> Result<(), Rejection> {
        let Some(live) = self.inner.registry.get(session_id) else {
            return Err(Rejection::UnknownSession(session_id.clone()));
        };
        let result = live.submit(actor, decision);
        match &result {
            Ok(()) => debug!(session = %session_id, %decision, "Decision accepted"),
            Err(rejection) => {
                debug!(session = %session_id, %decision, %rejection, "Decision rejected");
            },
        }
        result
    }

    /// Report for a running or recently finished session.
    #[must_use]
    pub fn get_report(&self, session_id: &SessionId) -> Option<SessionReport> {
        if let Some(live) = self.inner.registry.get(session_id) {
            return Some(live.report());
        }
        self.inner.finished_report(session_id)
    }

    /// Wait until a session finishes and return its final report.
    ///
    /// Returns immediately for a session that already finished, and `None`
    /// for an id the engine does not know.
    pub async fn wait_for_completion(&self, session_id: &SessionId) -> Option<SessionReport> {
        let Some(live) = self.inner.registry.get(session_id) else {
            return self.inner.finished_report(session_id);
        };
        let mut status = live.subscribe();
        // The sender lives in `live`, which we hold, so this cannot fail.
        let _ = status.wait_for(|s| s.is_terminal()).await;
        self.inner
            .finished_report(session_id)
            .or_else(|| Some(live.report()))
    }

    /// Analyse the guild, ask the advisor for a plan, and start a session.
    ///
    /// Analysis failures, advisor failures, and timeouts are shown to the
    /// owner as a notice and returned as [`LaunchOutcome::AdvisoryFailed`].
    ///
    /// # Errors
    ///
    /// Only [`CleanupError::Conflict`] and [`CleanupError::Internal`]
    /// propagate.
    pub async fn launch(
        &self,
        guild: Arc<dyn GuildState>,
        advisor: &dyn Advisor,
        request: LaunchRequest,
    ) -> CleanupResult<LaunchOutcome> {
        let id = request.session_id();
        if self.inner.registry.get(&id).is_some() {
            return Err(CleanupError::Conflict(id));
        }

        let captured = GuildSnapshot::capture(
            guild.as_ref(),
            &self.inner.applier,
            request.depth,
            request.focus,
        )
        .await;
        let snapshot = match captured {
            Ok(snapshot) => snapshot,
            Err(e) => return Ok(self.advisory_failed(&id, AdvisoryError::from(e)).await),
        };

        let timeout = self.inner.settings.advisory_timeout;
        let plan = match tokio::time::timeout(timeout, advisor.advise(&snapshot)).await {
            Ok(Ok(plan)) => plan,
            Ok(Err(e)) => return Ok(self.advisory_failed(&id, e).await),
            Err(_) => {
                let e = AdvisoryError::Timeout {
                    timeout_secs: timeout.as_secs(),
                };
                return Ok(self.advisory_failed(&id, e).await);
            },
        };

        info!(
            session = %id,
            proposals = plan.proposals.len(),
            suggestions = plan.suggestions.len(),
            dropped = plan.dropped,
            "Cleanup plan received"
        );

        if plan.is_empty() {
            let suggestions = plan.suggestions.len();
            let text = if suggestions == 0 {
                "No issues found! Your server structure looks good.".to_string()
            } else {
                format!(
                    "No issues found! The analysis also made {suggestions} optional suggestions."
                )
            };
            self.inner
                .presenter
                .present(&id, RenderRequest::Notice {
                    level: NoticeLevel::Info,
                    text,
                })
                .await;
            if suggestions > 0 {
                let report = suggestions_report(&plan.suggestions);
                self.inner
                    .presenter
                    .present(&id, RenderRequest::DetailedReport(report))
                    .await;
            }
            return Ok(LaunchOutcome::NoIssues { suggestions });
        }

        let id = self.start_session(guild, plan, request.owner, request.invocation)?;
        Ok(LaunchOutcome::Started(id))
    }

    async fn advisory_failed(&self, id: &SessionId, error: AdvisoryError) -> LaunchOutcome {
        warn!(session = %id, error = %error, "Cleanup analysis failed");
        let text = error.to_string();
        self.inner
            .presenter
            .present(id, RenderRequest::Notice {
                level: NoticeLevel::Error,
                text: text.clone(),
            })
            .await;
        LaunchOutcome::AdvisoryFailed(text)
    }
}

impl EngineInner {
    fn finished_report(&self, session_id: &SessionId) -> Option<SessionReport> {
        self.finished
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|r| &r.session_id == session_id)
            .cloned()
    }

    fn retain(&self, report: SessionReport) {
        let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        finished.push_back(report);
        while finished.len() > self.settings.retained_reports {
            finished.pop_front();
        }
    }

    async fn drive(
        self: Arc<Self>,
        guild: Arc<dyn GuildState>,
        live: Arc<LiveSession>,
        mut slot: oneshot::Receiver<Decision>,
    ) {
        let id = live.id();

        loop {
            let screen = live.read(|s| match s.phase() {
                Phase::Overview => Some((Phase::Overview, overview_prompt(s))),
                Phase::Reviewing => step_prompt(s).map(|p| (Phase::Reviewing, p)),
            });
            let Some((phase, prompt)) = screen else {
                break;
            };
            let wait = match phase {
                Phase::Overview => self.settings.overview_timeout,
                Phase::Reviewing => self.settings.step_timeout,
            };

            self.presenter.present(&id, RenderRequest::Prompt(prompt)).await;

            let Some(decision) = await_decision(&live, &mut slot, wait).await else {
                let cursor = live.read(ApprovalSession::cursor);
                warn!(cursor, wait_secs = wait.as_secs(), "Timed out waiting for a decision");
                live.update(ApprovalSession::time_out);
                break;
            };

            let cursor = live.read(ApprovalSession::cursor);
            info!(%decision, cursor, "Decision received");

            match decision {
                Decision::Start => live.update(ApprovalSession::begin_review),
                Decision::ShowReport => {
                    let report = live.read(detailed_report);
                    self.presenter
                        .present(&id, RenderRequest::DetailedReport(report))
                        .await;
                },
                Decision::Apply => self.apply_current(guild.as_ref(), &live, &id).await,
                Decision::Skip => live.update(ApprovalSession::record_skip),
                Decision::SkipAll => live.update(ApprovalSession::skip_all),
                Decision::Abort => live.update(ApprovalSession::abort),
            }

            if live.read(|s| s.status().is_terminal()) {
                break;
            }
            slot = live.arm();
        }

        self.finish(&id, &live).await;
    }

    async fn apply_current(&self, guild: &dyn GuildState, live: &LiveSession, id: &SessionId) {
        let Some((index, total, proposal)) = live.read(|s| {
            s.current()
                .map(|(index, p)| (index, s.proposals().len(), p.clone()))
        }) else {
            return;
        };

        let report = self.applier.apply(guild, &proposal).await;
        live.update(|s| s.record_apply(&report));
        self.presenter
            .present(id, RenderRequest::FixResult {
                index,
                total,
                report,
            })
            .await;
    }

    async fn finish(&self, id: &SessionId, live: &LiveSession) {
        let report = live.report();
        info!(
            status = %report.status,
            processed = report.processed,
            total = report.total,
            applied = report.applied.len(),
            "Cleanup session finished"
        );

        // Retain before removing so the report is always reachable.
        self.retain(report.clone());
        self.registry.remove(id);
        live.publish_status();

        self.presenter.present(id, RenderRequest::Summary(report)).await;
    }
}

/// Wait for the armed slot, or time out.
///
/// On timeout the slot is disarmed first. If a submitter took the sender
/// just before that, its decision is already in the receiver and wins.
async fn await_decision(
    live: &LiveSession,
    slot: &mut oneshot::Receiver<Decision>,
    wait: Duration,
) -> Option<Decision> {
    match tokio::time::timeout(wait, &mut *slot).await {
        Ok(Ok(decision)) => Some(decision),
        Ok(Err(_)) => None,
        Err(_) => {
            if live.disarm() {
                None
            } else {
                slot.try_recv().ok()
            }
        },
    }
}
