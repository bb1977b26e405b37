//! Approval sessions.
//!
//! [`ApprovalSession`] is the pure state machine: cursor, applied list,
//! phase, status. It knows nothing about tasks or timers. [`LiveSession`]
//! wraps it with the single pending decision slot and a status channel so
//! the engine's driver task and decision submitters can share it.
//!
//! # Invariants
//!
//! - `cursor` never decreases and never exceeds the number of proposals.
//! - At most one decision is pending at a time.
//! - Only the owner may decide.
//! - Once the status is terminal, nothing changes.

use chrono::{DateTime, Utc};
use guildsmith_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, RwLock};
use tokio::sync::{oneshot, watch};

use crate::applier::{FixOutcome, FixReport};
use crate::error::Rejection;
use crate::proposal::{ChangeProposal, CleanupPlan, Suggestion};
use crate::report::SessionReport;

/// Identifies a session: the owner plus the invocation that started it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    owner: UserId,
    invocation: String,
}

impl SessionId {
    /// Create a session id.
    #[must_use]
    pub fn new(owner: UserId, invocation: impl Into<String>) -> Self {
        Self {
            owner,
            invocation: invocation.into(),
        }
    }

    /// The session owner.
    #[must_use]
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// The originating invocation.
    #[must_use]
    pub fn invocation(&self) -> &str {
        &self.invocation
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.invocation)
    }
}

/// A decision from the session owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Leave the overview and review the first proposal.
    Start,
    /// Show the detailed report, stay on the overview.
    ShowReport,
    /// Apply the current proposal.
    Apply,
    /// Skip the current proposal.
    Skip,
    /// Skip every remaining proposal and finish.
    SkipAll,
    /// Stop the session.
    Abort,
}

impl Decision {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ShowReport => "show_report",
            Self::Apply => "apply",
            Self::Skip => "skip",
            Self::SkipAll => "skip_all",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "start" => Ok(Self::Start),
            "show_report" | "report" => Ok(Self::ShowReport),
            "apply" => Ok(Self::Apply),
            "skip" => Ok(Self::Skip),
            "skip_all" => Ok(Self::SkipAll),
            "abort" | "stop" | "cancel" => Ok(Self::Abort),
            other => Err(format!("unknown decision: {other}")),
        }
    }
}

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting decisions.
    Active,
    /// Every proposal was decided, or the owner skipped the rest.
    Completed,
    /// The owner stopped the session.
    Aborted,
    /// A decision wait expired.
    TimedOut,
}

impl SessionStatus {
    /// Whether the session has finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::TimedOut => "timed out",
        })
    }
}

/// Where an active session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Showing the batch summary.
    Overview,
    /// Walking the proposals.
    Reviewing,
}

impl Phase {
    /// Decisions offered in this phase.
    #[must_use]
    pub fn decisions(self) -> &'static [Decision] {
        match self {
            Self::Overview => &[Decision::Start, Decision::ShowReport, Decision::Abort],
            Self::Reviewing => &[
                Decision::Apply,
                Decision::Skip,
                Decision::SkipAll,
                Decision::Abort,
            ],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overview => "overview",
            Self::Reviewing => "reviewing",
        })
    }
}

/// What happened to one processed proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Index in the batch.
    pub index: usize,
    /// The owner's decision.
    pub decision: Decision,
    /// Apply outcome (`None` when skipped).
    pub outcome: Option<FixOutcome>,
    /// Apply reason, or why it was skipped.
    pub reason: String,
}

/// The pure approval state machine for one batch.
#[derive(Debug, Clone)]
pub struct ApprovalSession {
    id: SessionId,
    proposals: Vec<ChangeProposal>,
    suggestions: Vec<Suggestion>,
    cursor: usize,
    applied: Vec<String>,
    status: SessionStatus,
    phase: Phase,
    history: Vec<StepRecord>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl ApprovalSession {
    /// Open a session over a plan.
    ///
    /// With `confirm_start` the session opens on the overview; otherwise it
    /// opens on the first proposal.
    #[must_use]
    pub fn new(id: SessionId, plan: CleanupPlan, confirm_start: bool) -> Self {
        let mut session = Self {
            id,
            proposals: plan.proposals,
            suggestions: plan.suggestions,
            cursor: 0,
            applied: Vec::new(),
            status: SessionStatus::Active,
            phase: if confirm_start {
                Phase::Overview
            } else {
                Phase::Reviewing
            },
            history: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        };
        if session.phase == Phase::Reviewing && session.proposals.is_empty() {
            session.finish(SessionStatus::Completed);
        }
        session
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The only user allowed to decide.
    #[must_use]
    pub fn owner(&self) -> &UserId {
        self.id.owner()
    }

    /// Every proposal in the batch.
    #[must_use]
    pub fn proposals(&self) -> &[ChangeProposal] {
        &self.proposals
    }

    /// Informational suggestions.
    #[must_use]
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Index of the next proposal to decide.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Descriptions of applied proposals.
    #[must_use]
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Step records so far.
    #[must_use]
    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    /// The proposal awaiting a decision, with its index.
    #[must_use]
    pub fn current(&self) -> Option<(usize, &ChangeProposal)> {
        if self.status.is_terminal() || self.phase != Phase::Reviewing {
            return None;
        }
        self.proposals.get(self.cursor).map(|p| (self.cursor, p))
    }

    /// Decisions the owner can make right now.
    #[must_use]
    pub fn available_decisions(&self) -> &'static [Decision] {
        if self.status.is_terminal() {
            &[]
        } else {
            self.phase.decisions()
        }
    }

    /// Validate a decision without changing anything.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] if the session is closed, the actor is not
    /// the owner, or the decision is not offered in this phase.
    pub fn check_decision(&self, actor: &UserId, decision: Decision) -> Result<(), Rejection> {
        if self.status.is_terminal() {
            return Err(Rejection::SessionClosed {
                status: self.status,
            });
        }
        if actor != self.owner() {
            return Err(Rejection::NotOwner {
                actor: actor.clone(),
            });
        }
        if !self.phase.decisions().contains(&decision) {
            return Err(Rejection::Unavailable {
                decision,
                phase: self.phase,
            });
        }
        Ok(())
    }

    /// Move from the overview to the first proposal.
    pub fn begin_review(&mut self) {
        if self.status.is_terminal() || self.phase != Phase::Overview {
            return;
        }
        self.phase = Phase::Reviewing;
        if self.proposals.is_empty() {
            self.finish(SessionStatus::Completed);
        }
    }

    /// Record an apply of the current proposal and advance.
    pub fn record_apply(&mut self, report: &FixReport) {
        let Some((index, proposal)) = self.current() else {
            return;
        };
        let description = proposal.description.clone();
        if report.is_applied() {
            self.applied.push(description);
        }
        self.history.push(StepRecord {
            index,
            decision: Decision::Apply,
            outcome: Some(report.outcome),
            reason: report.reason.clone(),
        });
        self.advance();
    }

    /// Record a skip of the current proposal and advance.
    pub fn record_skip(&mut self) {
        let Some((index, _)) = self.current() else {
            return;
        };
        self.history.push(StepRecord {
            index,
            decision: Decision::Skip,
            outcome: None,
            reason: "skipped by owner".to_string(),
        });
        self.advance();
    }

    /// Finish without deciding the remaining proposals.
    pub fn skip_all(&mut self) {
        self.finish(SessionStatus::Completed);
    }

    /// Stop the session.
    pub fn abort(&mut self) {
        self.finish(SessionStatus::Aborted);
    }

    /// Record that a decision wait expired.
    pub fn time_out(&mut self) {
        self.finish(SessionStatus::TimedOut);
    }

    fn advance(&mut self) {
        self.cursor = self.cursor.saturating_add(1).min(self.proposals.len());
        if self.cursor == self.proposals.len() {
            self.finish(SessionStatus::Completed);
        }
    }

    fn finish(&mut self, status: SessionStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Snapshot the session as a report.
    #[must_use]
    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.id.clone(),
            status: self.status,
            total: self.proposals.len(),
            processed: self.cursor,
            applied: self.applied.clone(),
            suggestions: self.suggestions.len(),
            history: self.history.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// A session shared between its driver task and decision submitters.
#[derive(Debug)]
pub struct LiveSession {
    state: RwLock<ApprovalSession>,
    waiter: Mutex<Option<oneshot::Sender<Decision>>>,
    status: watch::Sender<SessionStatus>,
}

impl LiveSession {
    /// Wrap a session.
    #[must_use]
    pub fn new(session: ApprovalSession) -> Self {
        let (status, _) = watch::channel(session.status());
        Self {
            state: RwLock::new(session),
            waiter: Mutex::new(None),
            status,
        }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.read(|s| s.id().clone())
    }

    /// Read the session state.
    pub fn read<R>(&self, f: impl FnOnce(&ApprovalSession) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&*guard)
    }

    /// Mutate the session state.
    pub fn update<R>(&self, f: impl FnOnce(&mut ApprovalSession) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard)
    }

    /// Publish the current status to subscribers.
    ///
    /// The driver calls this once the session has fully wound down, so a
    /// subscriber that sees a terminal status can rely on the final report.
    pub fn publish_status(&self) {
        let status = self.read(ApprovalSession::status);
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Current report.
    #[must_use]
    pub fn report(&self) -> SessionReport {
        self.read(ApprovalSession::report)
    }

    /// Watch the status.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Open the pending-decision slot. Replaces any previous slot.
    pub fn arm(&self) -> oneshot::Receiver<Decision> {
        let (tx, rx) = oneshot::channel();
        *self.waiter.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        rx
    }

    /// Close the pending-decision slot.
    ///
    /// Returns `false` if a submitter already took it, in which case the
    /// decision has been sent and is waiting in the receiver.
    pub fn disarm(&self) -> bool {
        self.waiter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    /// Deliver a decision to the pending slot.
    ///
    /// The state check and the hand-off happen under the slot lock, and the
    /// driver updates state before it re-arms, so a decision is always
    /// validated against the step it will be applied to.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] if the decision is invalid or nothing is
    /// waiting for one.
    pub fn submit(&self, actor: &UserId, decision: Decision) -> Result<(), Rejection> {
        let mut waiter = self.waiter.lock().unwrap_or_else(|e| e.into_inner());
        self.read(|s| s.check_decision(actor, decision))?;
        let sender = waiter.take().ok_or(Rejection::NotAwaiting)?;
        sender.send(decision).map_err(|_| Rejection::NotAwaiting)
    }
}
