//! Guildsmith Cleanup - The AI cleanup approval workflow.
//!
//! An advisor proposes a batch of server-structure fixes. An approval
//! session then walks the owner through them one at a time:
//!
//! 1. Present the proposal
//! 2. Wait (bounded) for the owner's decision
//! 3. Apply it through the [`SafetyGate`] and [`FixApplier`], or skip it
//! 4. Advance, and report once the batch is exhausted or the owner stops
//!
//! Sessions are independent. Each runs as its own task, owned by the
//! [`CleanupEngine`] and addressed through the [`SessionRegistry`].
//!
//! # Example
//!
//! ```rust,ignore
//! use guildsmith_cleanup::prelude::*;
//!
//! let engine = CleanupEngine::new(presenter, CleanupSettings::default());
//! let id = engine.start_session(guild, plan, owner, "interaction-1")?;
//! engine.submit_decision(&id, &owner, Decision::Start)?;
//! ```

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod advisory;
pub mod applier;
pub mod engine;
pub mod error;
pub mod proposal;
pub mod registry;
pub mod render;
pub mod report;
pub mod safety;
pub mod session;
pub mod settings;
pub mod snapshot;

pub use advisory::{Advisor, AdvisoryError, AdvisoryResult, FixedAdvisor};
pub use applier::{FixApplier, FixOutcome, FixReport, normalized_name};
pub use engine::{CleanupEngine, LaunchOutcome, LaunchRequest};
pub use error::{CleanupError, CleanupResult, ProposalError, Rejection};
pub use proposal::{ChangeProposal, CleanupPlan, ProposalKind, Severity, Suggestion};
pub use registry::SessionRegistry;
pub use render::{
    CleanupPresenter, DetailedReport, NoticeLevel, Prompt, PromptField, RenderRequest,
};
pub use report::SessionReport;
pub use safety::{DEFAULT_PROTECTED_KEYWORDS, MutationCheck, ProtectedNames, SafetyGate};
pub use session::{
    ApprovalSession, Decision, LiveSession, Phase, SessionId, SessionStatus, StepRecord,
};
pub use settings::CleanupSettings;
pub use snapshot::{AnalysisDepth, FocusArea, GuildSnapshot, ReadOnlyFinding, UsageFindings};
