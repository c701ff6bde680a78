//! This module defines and re-exports the interfaces for the ledger store.
//! It serves as a central point for accessing traits related to data interaction.
mod ledger;

pub use ledger::{LedgerStore, LedgerTransaction};
