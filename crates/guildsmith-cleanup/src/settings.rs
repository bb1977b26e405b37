//! Engine settings.

use std::time::Duration;

use crate::safety::ProtectedNames;

/// Default wait for a decision on one proposal.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// Default wait on the overview screen.
pub const DEFAULT_OVERVIEW_TIMEOUT: Duration = Duration::from_secs(300);

/// Default bound on one advisor call.
pub const DEFAULT_ADVISORY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of finished reports kept for `get_report`.
pub const DEFAULT_RETAINED_REPORTS: usize = 64;

/// Tunables for [`CleanupEngine`](crate::CleanupEngine).
#[derive(Debug, Clone)]
pub struct CleanupSettings {
    /// Wait for a decision on one proposal.
    pub step_timeout: Duration,
    /// Wait on the overview screen.
    pub overview_timeout: Duration,
    /// Bound on the advisor call in [`launch`](crate::CleanupEngine::launch).
    pub advisory_timeout: Duration,
    /// Open sessions on the overview screen instead of the first proposal.
    pub confirm_start: bool,
    /// Protected resource names.
    pub protected: ProtectedNames,
    /// Replacement for whitespace in naming fixes.
    pub name_separator: char,
    /// Finished reports kept in memory.
    pub retained_reports: usize,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            step_timeout: DEFAULT_STEP_TIMEOUT,
            overview_timeout: DEFAULT_OVERVIEW_TIMEOUT,
            advisory_timeout: DEFAULT_ADVISORY_TIMEOUT,
            confirm_start: true,
            protected: ProtectedNames::default(),
            name_separator: '-',
            retained_reports: DEFAULT_RETAINED_REPORTS,
        }
    }
}

impl CleanupSettings {
    /// Builder: per-proposal decision timeout.
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Builder: overview timeout.
    #[must_use]
    pub fn with_overview_timeout(mut self, timeout: Duration) -> Self {
        self.overview_timeout = timeout;
        self
    }

    /// Builder: advisor timeout.
    #[must_use]
    pub fn with_advisory_timeout(mut self, timeout: Duration) -> Self {
        self.advisory_timeout = timeout;
        self
    }

    /// Builder: whether sessions open on the overview screen.
    #[must_use]
    pub fn with_confirm_start(mut self, confirm: bool) -> Self {
        self.confirm_start = confirm;
        self
    }

    /// Builder: protected names.
    #[must_use]
    pub fn with_protected(mut self, protected: ProtectedNames) -> Self {
        self.protected = protected;
        self
    }

    /// Builder: naming separator.
    #[must_use]
    pub fn with_name_separator(mut self, separator: char) -> Self {
        self.name_separator = separator;
        self
    }

    /// Builder: finished reports kept.
    #[must_use]
    pub fn with_retained_reports(mut self, count: usize) -> Self {
        self.retained_reports = count;
        self
    }
}
