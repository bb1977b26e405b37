//! Prelude module - commonly used types for convenient import.
//!
//! Use `use guildsmith_cleanup::prelude::*;` to import all essential types.

// Engine
pub use crate::{CleanupEngine, CleanupSettings, LaunchOutcome, LaunchRequest};

// Sessions
pub use crate::{Decision, Phase, SessionId, SessionReport, SessionStatus};

// Proposals
pub use crate::{ChangeProposal, CleanupPlan, ProposalKind, Severity, Suggestion};

// Safety and fixes
pub use crate::{FixApplier, FixOutcome, FixReport, ProtectedNames, SafetyGate};

// Collaborators
pub use crate::{Advisor, CleanupPresenter, GuildSnapshot, RenderRequest};

// Errors
pub use crate::{AdvisoryError, CleanupError, CleanupResult, Rejection};
