//! # Reputation Shared
//! This crate defines the data structures shared across the voting and
//! reputation engine: votes and their targets, the votable entities that carry
//! cached aggregates, and the append-only reputation changes.
pub mod types;
