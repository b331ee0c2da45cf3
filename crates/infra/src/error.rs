//! Application-level error returned by the services.

use thiserror::Error;

use protelab_core::DomainError;

use crate::store::StoreError;

/// Coarse error category, used by the HTTP layer to pick a status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Forbidden,
    Conflict,
    Internal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Illegal transition, duplicate request or stale version.
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        current: Option<String>,
        attempted: Option<String>,
    },

    /// Storage failed for reasons unrelated to the request.
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl ServiceError {
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

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict { .. } => "conflict",
            Self::Store(_) => "internal",
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg) | Self::InvalidArgument(msg) | Self::Forbidden(msg) => msg.clone(),
            Self::Conflict { message, .. } => message.clone(),
            Self::Store(err) => err.to_string(),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound(msg) => ServiceError::NotFound(msg),
            DomainError::InvalidArgument(msg) => ServiceError::InvalidArgument(msg),
            DomainError::Forbidden(msg) => ServiceError::Forbidden(msg),
            DomainError::Conflict {
                message,
                current,
                attempted,
            } => ServiceError::Conflict {
                message,
                current,
                attempted,
            },
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => ServiceError::conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
