//! Errors raised by the vote state machine.
use reputation_shared::types::VoteKind;
use thiserror::Error;

/// Represents a vote request the state machine refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    /// The voter already holds a vote of the requested kind on the target.
    #[error("you have already cast this vote ({0})")]
    DuplicateVote(VoteKind),
}
