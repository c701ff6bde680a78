//! Reputation Server Library
//!
//! HTTP surface of the voting and reputation engine: environment
//! configuration, dependency wiring, error mapping and the axum router.

pub mod config;
pub mod errors;
pub mod server;

pub use config::{Dependencies, Settings};
pub use errors::{ApiError, ServerError};
