//! Platform error types.

use thiserror::Error;

/// Errors returned by a chat-platform collaborator.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform refused the operation (missing permission, role hierarchy).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The addressed resource no longer exists.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Resource kind ("channel", "role").
        kind: &'static str,
        /// The id that could not be found.
        id: String,
    },

    /// The platform asked us to slow down.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested wait, in milliseconds.
        retry_after_ms: u64,
    },

    /// Transport or protocol failure talking to the platform.
    #[error("platform request failed: {0}")]
    Request(String),

    /// Internal error in the platform adapter.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Whether this is a permission refusal.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Whether the addressed resource vanished.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
