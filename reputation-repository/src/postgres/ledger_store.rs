use async_trait::async_trait;
use reputation_shared::types::{
    Answer, AnswerId, NewReputationChange, Question, QuestionId, ReputationChange, User, UserId,
    VotableEntity, Vote, VoteKind, VoteTarget,
};
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use super::MIGRATOR;
use super::rows::{AnswerRow, QuestionRow, ReputationChangeRow, UserRow, VoteRow};
use crate::{LedgerStore, LedgerStoreError, LedgerTransaction};

const QUESTION_COLUMNS: &str = "id, author_id, title, vote_count";
const ANSWER_COLUMNS: &str = "id, question_id, author_id, vote_count, is_accepted";
const USER_COLUMNS: &str = "id, username, reputation";
const REPUTATION_CHANGE_COLUMNS: &str = "id, user_id, kind, delta, description, created_at";

/// PostgreSQL implementation of the ledger store.
///
/// Provides reads through the pool and hands out [`PostgresLedgerTransaction`]s
/// for every mutation.
pub struct PostgresLedgerStore {
    pool: sqlx::PgPool,
}

impl PostgresLedgerStore {
    /// Creates a new PostgreSQL ledger store.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresLedgerStore)` - Ready-to-use store
    /// * `Err(LedgerStoreError)` - Future validation errors (currently always succeeds)
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, LedgerStoreError> {
        Ok(Self { pool })
    }

    /// Connects a new pool and wraps it in a store.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, LedgerStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Self::new(pool).await
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), LedgerStoreError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, LedgerStoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresLedgerTransaction { tx }))
    }

    async fn find_question(&self, id: QuestionId) -> Result<Option<Question>, LedgerStoreError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Question::from))
    }

    async fn find_answer(&self, id: AnswerId) -> Result<Option<Answer>, LedgerStoreError> {
        let row = sqlx::query_as::<_, AnswerRow>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Answer::from))
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerStoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_vote(
        &self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<Option<Vote>, LedgerStoreError> {
        sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT voter_id, target_type, target_id, kind
            FROM votes
            WHERE voter_id = $1 AND target_type = $2 AND target_id = $3
            "#,
        )
        .bind(voter_id)
        .bind(target.target_type().code())
        .bind(target.id())
        .fetch_optional(&self.pool)
        .await?
        .map(Vote::try_from)
        .transpose()
    }

    async fn reputation_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReputationChange>, LedgerStoreError> {
        let rows = sqlx::query_as::<_, ReputationChangeRow>(&format!(
            "SELECT {REPUTATION_CHANGE_COLUMNS} FROM reputation_changes WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReputationChange::try_from).collect()
    }
}

/// A single PostgreSQL transaction.
///
/// Runs at the default `READ COMMITTED` isolation level. Vote rows are read
/// with `FOR UPDATE`, questions are locked for acceptance changes, and every
/// aggregate is updated in place, which is enough to keep the ledger and the
/// aggregates consistent without serializable isolation.
pub struct PostgresLedgerTransaction {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl LedgerTransaction for PostgresLedgerTransaction {
    async fn find_vote(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<Option<Vote>, LedgerStoreError> {
        sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT voter_id, target_type, target_id, kind
            FROM votes
            WHERE voter_id = $1 AND target_type = $2 AND target_id = $3
            FOR UPDATE
            "#,
        )
        .bind(voter_id)
        .bind(target.target_type().code())
        .bind(target.id())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(Vote::try_from)
        .transpose()
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<(), LedgerStoreError> {
        // A concurrent insert of the same key fails here with 23505, which
        // converts into a retryable conflict.
        sqlx::query(
            r#"
            INSERT INTO votes (voter_id, target_type, target_id, kind)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(vote.voter_id)
        .bind(vote.target.target_type().code())
        .bind(vote.target.id())
        .bind(vote.kind.code())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_vote_kind(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
        kind: VoteKind,
    ) -> Result<(), LedgerStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE votes
            SET kind = $4, voted_at = NOW()
            WHERE voter_id = $1 AND target_type = $2 AND target_id = $3
            "#,
        )
        .bind(voter_id)
        .bind(target.target_type().code())
        .bind(target.id())
        .bind(kind.code())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerStoreError::conflict(format!(
                "vote of user {voter_id} on {target} disappeared during update"
            )));
        }
        Ok(())
    }

    async fn delete_vote(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<(), LedgerStoreError> {
        let result = sqlx::query(
            "DELETE FROM votes WHERE voter_id = $1 AND target_type = $2 AND target_id = $3",
        )
        .bind(voter_id)
        .bind(target.target_type().code())
        .bind(target.id())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerStoreError::conflict(format!(
                "vote of user {voter_id} on {target} disappeared during delete"
            )));
        }
        Ok(())
    }

    async fn increment_vote_count(
        &mut self,
        target: VoteTarget,
        delta: i32,
    ) -> Result<Option<VotableEntity>, LedgerStoreError> {
        debug!(%target, delta, "Incrementing vote count");
        let entity = match target {
            VoteTarget::Question(id) => sqlx::query_as::<_, QuestionRow>(&format!(
                "UPDATE questions SET vote_count = vote_count + $1 WHERE id = $2 RETURNING {QUESTION_COLUMNS}"
            ))
            .bind(delta)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(|row| VotableEntity::Question(row.into())),
            VoteTarget::Answer(id) => sqlx::query_as::<_, AnswerRow>(&format!(
                "UPDATE answers SET vote_count = vote_count + $1 WHERE id = $2 RETURNING {ANSWER_COLUMNS}"
            ))
            .bind(delta)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(|row| VotableEntity::Answer(row.into())),
        };
        Ok(entity)
    }

    async fn lock_question(
        &mut self,
        id: QuestionId,
    ) -> Result<Option<Question>, LedgerStoreError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Question::from))
    }

    async fn find_answer(&mut self, id: AnswerId) -> Result<Option<Answer>, LedgerStoreError> {
        let row = sqlx::query_as::<_, AnswerRow>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Answer::from))
    }

    async fn clear_accepted_answers(
        &mut self,
        question_id: QuestionId,
        except: AnswerId,
    ) -> Result<Vec<Answer>, LedgerStoreError> {
        let rows = sqlx::query_as::<_, AnswerRow>(&format!(
            r#"
            UPDATE answers SET is_accepted = FALSE
            WHERE question_id = $1 AND id <> $2 AND is_accepted
            RETURNING {ANSWER_COLUMNS}
            "#
        ))
        .bind(question_id)
        .bind(except)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }

    async fn set_answer_accepted(
        &mut self,
        id: AnswerId,
        accepted: bool,
    ) -> Result<Option<Answer>, LedgerStoreError> {
        let row = sqlx::query_as::<_, AnswerRow>(&format!(
            "UPDATE answers SET is_accepted = $1 WHERE id = $2 RETURNING {ANSWER_COLUMNS}"
        ))
        .bind(accepted)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Answer::from))
    }

    async fn append_reputation_change(
        &mut self,
        change: &NewReputationChange,
    ) -> Result<ReputationChange, LedgerStoreError> {
        let row = sqlx::query_as::<_, ReputationChangeRow>(&format!(
            r#"
            INSERT INTO reputation_changes (user_id, kind, delta, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {REPUTATION_CHANGE_COLUMNS}
            "#
        ))
        .bind(change.user_id)
        .bind(change.kind.as_str())
        .bind(change.delta)
        .bind(&change.description)
        .fetch_one(&mut *self.tx)
        .await?;
        ReputationChange::try_from(row)
    }

    async fn increment_reputation(
        &mut self,
        user_id: UserId,
        delta: i32,
    ) -> Result<Option<User>, LedgerStoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET reputation = reputation + $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(delta)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(User::from))
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerStoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerStoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
