//! PostgreSQL implementation of the ledger store.
//!
//! ## Key Features
//!
//! - Connection pooling with `sqlx::PgPool`
//! - One database transaction per [`LedgerTransaction`](crate::LedgerTransaction)
//! - Aggregates updated with `SET col = col + $delta` so concurrent writers
//!   never lose an update
//! - Vote uniqueness enforced by the `(voter_id, target_type, target_id)`
//!   primary key; a losing concurrent insert surfaces as a retryable
//!   `TransactionConflict`
//!
//! ## Database Tables
//!
//! - `votes`: one row per voter and target
//! - `questions` / `answers`: carry the cached `vote_count`, answers also
//!   carry `is_accepted`
//! - `users`: carries the cached `reputation`
//! - `reputation_changes`: append-only reputation ledger
mod ledger_store;
mod rows;

pub use ledger_store::{PostgresLedgerStore, PostgresLedgerTransaction};

/// Embedded schema migrations, shared with database-backed tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("src/postgres/migrations");
