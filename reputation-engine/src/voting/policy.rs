//! Reputation amounts awarded by the platform.
//!
//! These values are product policy. Answer votes weigh twice as much as
//! question votes.
use reputation_shared::types::TargetType;

/// Reputation for a new vote on a question.
pub const QUESTION_VOTE_REPUTATION: i32 = 10;

/// Reputation for a new vote on an answer.
pub const ANSWER_VOTE_REPUTATION: i32 = 20;

/// Reputation for having an answer accepted, taken back on unaccept.
pub const ACCEPTED_ANSWER_REPUTATION: i32 = 15;

/// Reputation one new vote on `target_type` is worth. A flip moves twice this
/// amount.
pub fn vote_reputation(target_type: TargetType) -> i32 {
    match target_type {
        TargetType::Question => QUESTION_VOTE_REPUTATION,
        TargetType::Answer => ANSWER_VOTE_REPUTATION,
    }
}
