use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AnswerId, QuestionId, UserId};

/// Represents the type of vote cast by a user.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VoteKind {
    /// Indicates an upvote or positive endorsement.
    #[serde(rename = "upvote")]
    Up,
    /// Indicates a downvote or negative endorsement.
    #[serde(rename = "downvote")]
    Down,
}

impl VoteKind {
    /// Storage code for this kind, as persisted in the `votes.kind` column.
    pub fn code(self) -> i16 {
        match self {
            VoteKind::Up => 0,
            VoteKind::Down => 1,
        }
    }

    /// Decodes a storage code back into a kind.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(VoteKind::Up),
            1 => Some(VoteKind::Down),
            _ => None,
        }
    }

    /// `+1` for an upvote, `-1` for a downvote.
    pub fn sign(self) -> i32 {
        match self {
            VoteKind::Up => 1,
            VoteKind::Down => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Up => "upvote",
            VoteKind::Down => "downvote",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is neither `upvote` nor `downvote`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid vote kind: {0:?}")]
pub struct ParseVoteKindError(pub String);

impl FromStr for VoteKind {
    type Err = ParseVoteKindError;

    /// Accepts `upvote` and `downvote` in any ASCII case, ignoring surrounding
    /// whitespace. Clients historically sent both `upvote` and `Upvote`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("upvote") {
            Ok(VoteKind::Up)
        } else if trimmed.eq_ignore_ascii_case("downvote") {
            Ok(VoteKind::Down)
        } else {
            Err(ParseVoteKindError(s.to_string()))
        }
    }
}

/// Discriminant of a [`VoteTarget`], persisted as `votes.target_type`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Question,
    Answer,
}

impl TargetType {
    pub fn code(self) -> i16 {
        match self {
            TargetType::Question => 0,
            TargetType::Answer => 1,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(TargetType::Question),
            1 => Some(TargetType::Answer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Question => "question",
            TargetType::Answer => "answer",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity a vote applies to.
///
/// A vote always points at exactly one question or exactly one answer; the
/// enum makes any other combination unrepresentable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "target_type", content = "target_id", rename_all = "snake_case")]
pub enum VoteTarget {
    Question(QuestionId),
    Answer(AnswerId),
}

impl VoteTarget {
    pub fn target_type(&self) -> TargetType {
        match self {
            VoteTarget::Question(_) => TargetType::Question,
            VoteTarget::Answer(_) => TargetType::Answer,
        }
    }

    /// Raw id of the question or answer.
    pub fn id(&self) -> i64 {
        match self {
            VoteTarget::Question(id) | VoteTarget::Answer(id) => *id,
        }
    }

    /// Rebuilds a target from its persisted `(target_type, target_id)` pair.
    pub fn from_parts(target_type: TargetType, id: i64) -> Self {
        match target_type {
            TargetType::Question => VoteTarget::Question(id),
            TargetType::Answer => VoteTarget::Answer(id),
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target_type(), self.id())
    }
}

/// A user's single active vote on a target.
///
/// At most one `Vote` exists per `(voter_id, target)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub voter_id: UserId,
    pub target: VoteTarget,
    pub kind: VoteKind,
}
