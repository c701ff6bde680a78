//! Error types for the reputation engine.
mod engine;
mod vote;

pub use engine::{EngineError, ErrorKind, ErrorReport};
pub use vote::VoteError;
