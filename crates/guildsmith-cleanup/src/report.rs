//! Session reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SessionId, SessionStatus, StepRecord};

/// Aggregate outcome of one approval session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Which session.
    pub session_id: SessionId,
    /// Status when the report was taken.
    pub status: SessionStatus,
    /// Number of proposals in the batch.
    pub total: usize,
    /// Number of proposals the owner decided on (the cursor).
    pub processed: usize,
    /// Descriptions of applied proposals, in order.
    pub applied: Vec<String>,
    /// Informational suggestions that came with the batch.
    pub suggestions: usize,
    /// One record per processed proposal.
    pub history: Vec<StepRecord>,
    /// When the session opened.
    pub started_at: DateTime<Utc>,
    /// When it reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionReport {
    /// Number of applied proposals.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Proposals never decided on.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }

    /// Whether the session has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
