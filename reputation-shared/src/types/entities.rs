use serde::{Deserialize, Serialize};

use crate::types::{AnswerId, QuestionId, UserId};

/// A question as seen by the voting engine.
///
/// Only the fields the engine reads or mutates are carried; text, tags and
/// view counters belong to the content service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub author_id: UserId,
    pub title: String,
    /// Cached net score, changed only through vote deltas.
    pub vote_count: i32,
}

/// An answer as seen by the voting engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub author_id: UserId,
    pub vote_count: i32,
    pub is_accepted: bool,
}

/// A user and their cached reputation total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub reputation: i32,
}

/// Either kind of entity that can receive votes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VotableEntity {
    Question(Question),
    Answer(Answer),
}

impl VotableEntity {
    /// The user credited or debited when this entity is voted on.
    pub fn author_id(&self) -> UserId {
        match self {
            VotableEntity::Question(q) => q.author_id,
            VotableEntity::Answer(a) => a.author_id,
        }
    }

    pub fn vote_count(&self) -> i32 {
        match self {
            VotableEntity::Question(q) => q.vote_count,
            VotableEntity::Answer(a) => a.vote_count,
        }
    }
}
