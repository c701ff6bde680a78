//! # Reputation Engine
//! This crate implements the voting and reputation core of the Q&A platform.
//!
//! ## Components
//!
//! - [`voting`]: pure vote state machine and the reputation policy constants
//! - [`reputation`]: append-only reputation ledger service
//! - [`acceptance`]: answer acceptance state machine
//! - [`coordinator`]: transactional entry point for votes and acceptance
//! - [`config`]: retry and repeat-vote settings
//! - [`errors`]: error types shared by all components
pub mod acceptance;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod reputation;
pub mod voting;

pub use config::{EngineConfig, RepeatVotePolicy};
pub use coordinator::VoteCoordinator;
pub use errors::{EngineError, ErrorKind, ErrorReport, VoteError};
pub use reputation::{ReputationAudit, ReputationLedger, ReputationStatement};
