//! # Reputation Repository
//! This crate provides the ledger store interfaces used by the voting engine,
//! together with a PostgreSQL implementation and an in-memory implementation.
//! It includes definitions for errors, interfaces and both backends.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use errors::LedgerStoreError;
pub use interfaces::{LedgerStore, LedgerTransaction};
pub use memory::MemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
