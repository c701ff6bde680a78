//! Error types for the ledger store.
//! Defines specific errors that can occur during database operations on votes,
//! aggregates and the reputation ledger.
use thiserror::Error;

/// SQLSTATE codes that indicate a transaction lost a race and may be retried:
/// unique violation, serialization failure and deadlock.
const RETRYABLE_SQLSTATES: [&str; 3] = ["23505", "40001", "40P01"];

/// Represents errors that can occur within the ledger store.
///
/// Storage failures are split into `TransactionConflict`, which a caller may
/// retry from the start of its transaction, and everything else.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid vote type: {0}")]
    InvalidVoteType(i16),

    #[error("Invalid target type: {0}")]
    InvalidTargetType(i16),

    #[error("Invalid reputation change kind: {0}")]
    InvalidReputationKind(String),
}

impl LedgerStoreError {
    /// Create a transaction conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::TransactionConflict(msg.into())
    }

    /// Whether the failed transaction can be retried from scratch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::TransactionConflict(_))
    }
}

impl From<sqlx::Error> for LedgerStoreError {
    fn from(err: sqlx::Error) -> Self {
        let retryable = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&&*code));

        if retryable {
            Self::TransactionConflict(err.to_string())
        } else {
            Self::DatabaseError(err)
        }
    }
}
