use chrono::{DateTime, Utc};
use reputation_shared::types::{
    Answer, Question, ReputationChange, ReputationChangeKind, TargetType, User, Vote, VoteKind,
    VoteTarget,
};

use crate::errors::LedgerStoreError;

#[derive(sqlx::FromRow)]
pub(crate) struct QuestionRow {
    id: i64,
    author_id: i64,
    title: String,
    vote_count: i32,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            vote_count: row.vote_count,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AnswerRow {
    id: i64,
    question_id: i64,
    author_id: i64,
    vote_count: i32,
    is_accepted: bool,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            question_id: row.question_id,
            author_id: row.author_id,
            vote_count: row.vote_count,
            is_accepted: row.is_accepted,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    username: String,
    reputation: i32,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            reputation: row.reputation,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct VoteRow {
    voter_id: i64,
    target_type: i16,
    target_id: i64,
    kind: i16,
}

impl TryFrom<VoteRow> for Vote {
    type Error = LedgerStoreError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let target_type = TargetType::from_code(row.target_type)
            .ok_or(LedgerStoreError::InvalidTargetType(row.target_type))?;
        let kind = VoteKind::from_code(row.kind).ok_or(LedgerStoreError::InvalidVoteType(row.kind))?;

        Ok(Vote {
            voter_id: row.voter_id,
            target: VoteTarget::from_parts(target_type, row.target_id),
            kind,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReputationChangeRow {
    id: i64,
    user_id: i64,
    kind: String,
    delta: i32,
    description: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReputationChangeRow> for ReputationChange {
    type Error = LedgerStoreError;

    fn try_from(row: ReputationChangeRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<ReputationChangeKind>()
            .map_err(LedgerStoreError::InvalidReputationKind)?;

        Ok(ReputationChange {
            id: row.id,
            user_id: row.user_id,
            kind,
            delta: row.delta,
            description: row.description,
            created_at: row.created_at,
        })
    }
}
