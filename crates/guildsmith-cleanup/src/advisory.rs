//! The advisory producer boundary.

use async_trait::async_trait;
use guildsmith_core::PlatformError;

use crate::error::ProposalError;
use crate::proposal::CleanupPlan;
use crate::snapshot::GuildSnapshot;

/// Errors from producing a cleanup plan.
#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    /// The advisor did not answer in time.
    #[error("analysis timed out after {timeout_secs}s")]
    Timeout {
        /// The limit that expired.
        timeout_secs: u64,
    },

    /// The advisor's backend failed.
    #[error("analysis service failed: {0}")]
    Provider(String),

    /// The advisor answered with something that is not a plan.
    #[error(transparent)]
    Malformed(#[from] ProposalError),

    /// The guild could not be read.
    #[error("failed to analyze server structure: {0}")]
    Snapshot(#[from] PlatformError),
}

/// Result type for advisory operations.
pub type AdvisoryResult<T> = Result<T, AdvisoryError>;

/// Produces a batch of proposals for a guild.
///
/// Implementations must be conservative: everything they propose is
/// re-checked by the safety gate, but an advisor that only proposes safe,
/// reversible changes keeps sessions short.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Analyse a snapshot and return a plan.
    async fn advise(&self, snapshot: &GuildSnapshot) -> AdvisoryResult<CleanupPlan>;
}

/// An advisor that always returns the same plan.
///
/// Used to replay a saved plan without calling a model.
#[derive(Debug, Clone)]
pub struct FixedAdvisor {
    plan: CleanupPlan,
}

impl FixedAdvisor {
    /// Wrap a plan.
    #[must_use]
    pub fn new(plan: CleanupPlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl Advisor for FixedAdvisor {
    async fn advise(&self, _snapshot: &GuildSnapshot) -> AdvisoryResult<CleanupPlan> {
        Ok(self.plan.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AdvisoryError::Timeout { timeout_secs: 30 };
        assert_eq!(err.to_string(), "analysis timed out after 30s");

        let err = AdvisoryError::from(ProposalError::Malformed("not valid JSON".to_string()));
        assert_eq!(err.to_string(), "malformed cleanup plan: not valid JSON");
    }
}
