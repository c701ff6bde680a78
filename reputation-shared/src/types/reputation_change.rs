use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Tag identifying the event that triggered a reputation change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReputationChangeKind {
    QuestionUpvoted,
    QuestionDownvoted,
    QuestionVoteChanged,
    QuestionVoteRetracted,
    AnswerUpvoted,
    AnswerDownvoted,
    AnswerVoteChanged,
    AnswerVoteRetracted,
    AnswerAccepted,
    AnswerUnaccepted,
}

impl ReputationChangeKind {
    const ALL: [ReputationChangeKind; 10] = [
        ReputationChangeKind::QuestionUpvoted,
        ReputationChangeKind::QuestionDownvoted,
        ReputationChangeKind::QuestionVoteChanged,
        ReputationChangeKind::QuestionVoteRetracted,
        ReputationChangeKind::AnswerUpvoted,
        ReputationChangeKind::AnswerDownvoted,
        ReputationChangeKind::AnswerVoteChanged,
        ReputationChangeKind::AnswerVoteRetracted,
        ReputationChangeKind::AnswerAccepted,
        ReputationChangeKind::AnswerUnaccepted,
    ];

    /// Text tag persisted in `reputation_changes.kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            ReputationChangeKind::QuestionUpvoted => "question_upvoted",
            ReputationChangeKind::QuestionDownvoted => "question_downvoted",
            ReputationChangeKind::QuestionVoteChanged => "question_vote_changed",
            ReputationChangeKind::QuestionVoteRetracted => "question_vote_retracted",
            ReputationChangeKind::AnswerUpvoted => "answer_upvoted",
            ReputationChangeKind::AnswerDownvoted => "answer_downvoted",
            ReputationChangeKind::AnswerVoteChanged => "answer_vote_changed",
            ReputationChangeKind::AnswerVoteRetracted => "answer_vote_retracted",
            ReputationChangeKind::AnswerAccepted => "answer_accepted",
            ReputationChangeKind::AnswerUnaccepted => "answer_unaccepted",
        }
    }
}

impl fmt::Display for ReputationChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReputationChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A reputation change that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReputationChange {
    pub user_id: UserId,
    pub kind: ReputationChangeKind,
    pub delta: i32,
    pub description: String,
}

/// An immutable entry of the reputation ledger.
///
/// Summing every change of a user reproduces that user's cached reputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReputationChange {
    pub id: i64,
    pub user_id: UserId,
    pub kind: ReputationChangeKind,
    pub delta: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
