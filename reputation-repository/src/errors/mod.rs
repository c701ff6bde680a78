//! Error types for the ledger repository.
//! Consolidates and re-exports error types related to ledger store operations.
mod ledger;

pub use ledger::LedgerStoreError;
