//! Errors surfaced by the coordinator, the acceptance state machine and the
//! reputation ledger.
use reputation_repository::LedgerStoreError;
use reputation_shared::types::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::VoteError;

/// Errors that can occur while casting votes, accepting answers or applying
/// reputation changes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A question, answer or user could not be resolved.
    #[error("{0} not found")]
    NotFound(String),

    /// The requested vote kind is neither upvote nor downvote.
    #[error("invalid vote kind: {0:?}")]
    InvalidVoteKind(String),

    /// The request repeats the vote already on record.
    #[error(transparent)]
    Conflict(#[from] VoteError),

    /// The caller may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The user a reputation change targets does not exist.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// The operation kept losing races against concurrent writers.
    #[error("transient storage failure, retry later: {0}")]
    Transient(String),

    #[error("storage error: {0}")]
    Storage(#[from] LedgerStoreError),
}

impl EngineError {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Whether the whole transaction may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_conflict())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidVoteKind(_) => ErrorKind::InvalidVoteKind,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::UserNotFound(_) => ErrorKind::UserNotFound,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Structured form of the error, suitable for returning to callers.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Machine-readable classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidVoteKind,
    Conflict,
    Forbidden,
    UserNotFound,
    Transient,
    Storage,
}

/// An error kind paired with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}
