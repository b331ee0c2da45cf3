//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Every variant
/// maps to a client error at the HTTP boundary; infrastructure failures live
/// in the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range input (including unknown enum values).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller lacks the required relationship to the entity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A state-machine precondition failed (illegal transition, duplicate
    /// request, stale version).
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        current: Option<String>,
        attempted: Option<String>,
    },
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict {
            message: msg.into(),
            current: None,
            attempted: None,
        }
    }

    /// Conflict carrying the state the entity was in and the state the caller
    /// tried to move it to.
    pub fn transition_conflict(
        msg: impl Into<String>,
        current: impl core::fmt::Display,
        attempted: impl core::fmt::Display,
    ) -> Self {
        Self::Conflict {
            message: msg.into(),
            current: Some(current.to_string()),
            attempted: Some(attempted.to_string()),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
