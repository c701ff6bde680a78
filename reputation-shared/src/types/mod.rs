mod entities;
mod reputation_change;
mod vote;

pub use entities::{Answer, Question, User, VotableEntity};
pub use reputation_change::{NewReputationChange, ReputationChange, ReputationChangeKind};
pub use vote::{ParseVoteKindError, TargetType, Vote, VoteKind, VoteTarget};

/// Identifier of a user (voter, question author or answer author).
pub type UserId = i64;
/// Identifier of a question.
pub type QuestionId = i64;
/// Identifier of an answer.
pub type AnswerId = i64;
