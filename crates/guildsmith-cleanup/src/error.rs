//! Cleanup workflow errors.

use guildsmith_core::UserId;

use crate::session::{Decision, Phase, SessionId, SessionStatus};

/// Errors from starting or driving cleanup sessions.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    /// A live session already uses this id.
    #[error("a cleanup session is already running for {0}")]
    Conflict(SessionId),

    /// The plan has no proposals to review.
    #[error("cleanup plan contains no proposals")]
    EmptyPlan,

    /// Internal engine error.
    #[error("internal cleanup error: {0}")]
    Internal(String),
}

/// Result type for cleanup operations.
pub type CleanupResult<T> = Result<T, CleanupError>;

/// Why a submitted decision was not accepted.
///
/// A rejection never changes session state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// No live session has this id.
    #[error("no active cleanup session {0}")]
    UnknownSession(SessionId),

    /// Only the session owner may decide.
    #[error("user {actor} does not own this cleanup session")]
    NotOwner {
        /// Who tried to decide.
        actor: UserId,
    },

    /// The session already finished.
    #[error("cleanup session is {status}")]
    SessionClosed {
        /// The terminal status.
        status: SessionStatus,
    },

    /// No decision is pending (a fix is being applied, or the wait ended).
    #[error("cleanup session is not waiting for a decision")]
    NotAwaiting,

    /// The decision is not offered in the current phase.
    #[error("{decision} is not available during {phase}")]
    Unavailable {
        /// The rejected decision.
        decision: Decision,
        /// The phase the session is in.
        phase: Phase,
    },
}

/// Advisor output could not be turned into a plan.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    /// Not JSON, or not the expected top-level shape.
    #[error("malformed cleanup plan: {0}")]
    Malformed(String),
}

/// Result type for proposal ingestion.
pub type ProposalResult<T> = Result<T, ProposalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::Unavailable {
            decision: Decision::Apply,
            phase: Phase::Overview,
        };
        assert_eq!(rejection.to_string(), "apply is not available during overview");

        let rejection = Rejection::SessionClosed {
            status: SessionStatus::TimedOut,
        };
        assert_eq!(rejection.to_string(), "cleanup session is timed out");
    }
}
