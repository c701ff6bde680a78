//! This module defines the `LedgerStore` and `LedgerTransaction` traits, which
//! provide an interface to the underlying data store for votes, vote counts,
//! answer acceptance and the reputation ledger.
use async_trait::async_trait;
use reputation_shared::types::{
    Answer, AnswerId, NewReputationChange, Question, QuestionId, ReputationChange, User, UserId,
    VotableEntity, Vote, VoteKind, VoteTarget,
};

use crate::errors::LedgerStoreError;

/// A trait that defines the interface to the ledger data store.
///
/// Read methods run outside of any transaction. Every mutation goes through a
/// [`LedgerTransaction`] obtained from [`LedgerStore::begin`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a new transaction.
    ///
    /// Implementations must not let two open transactions observe each
    /// other's uncommitted writes.
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, LedgerStoreError>;

    async fn find_question(&self, id: QuestionId) -> Result<Option<Question>, LedgerStoreError>;

    async fn find_answer(&self, id: AnswerId) -> Result<Option<Answer>, LedgerStoreError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerStoreError>;

    /// Returns the vote `voter_id` currently holds on `target`, if any.
    async fn find_vote(
        &self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<Option<Vote>, LedgerStoreError>;

    /// Returns every reputation change of a user, oldest first.
    async fn reputation_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReputationChange>, LedgerStoreError>;

    /// Resolves a vote target to the entity it points at.
    async fn find_votable(
        &self,
        target: VoteTarget,
    ) -> Result<Option<VotableEntity>, LedgerStoreError> {
        Ok(match target {
            VoteTarget::Question(id) => self.find_question(id).await?.map(VotableEntity::Question),
            VoteTarget::Answer(id) => self.find_answer(id).await?.map(VotableEntity::Answer),
        })
    }
}

/// A unit of work against the ledger store.
///
/// Nothing written through a transaction is visible to others until
/// [`commit`](LedgerTransaction::commit) succeeds. Dropping a transaction
/// without committing discards its writes.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Reads the vote on `(voter_id, target)`, locking it against concurrent
    /// writers for the rest of the transaction.
    async fn find_vote(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<Option<Vote>, LedgerStoreError>;

    /// Inserts a new vote.
    ///
    /// Fails with `TransactionConflict` when a vote for the same
    /// `(voter_id, target)` already exists.
    async fn insert_vote(&mut self, vote: &Vote) -> Result<(), LedgerStoreError>;

    async fn update_vote_kind(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
        kind: VoteKind,
    ) -> Result<(), LedgerStoreError>;

    async fn delete_vote(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<(), LedgerStoreError>;

    /// Atomically adds `delta` to the target's `vote_count` and returns the
    /// updated entity, or `None` if the target no longer exists.
    async fn increment_vote_count(
        &mut self,
        target: VoteTarget,
        delta: i32,
    ) -> Result<Option<VotableEntity>, LedgerStoreError>;

    /// Reads a question and locks it for the rest of the transaction.
    async fn lock_question(
        &mut self,
        id: QuestionId,
    ) -> Result<Option<Question>, LedgerStoreError>;

    async fn find_answer(&mut self, id: AnswerId) -> Result<Option<Answer>, LedgerStoreError>;

    /// Clears `is_accepted` on every answer of `question_id` other than
    /// `except`. Returns the answers whose flag was cleared, as they are after
    /// the update.
    async fn clear_accepted_answers(
        &mut self,
        question_id: QuestionId,
        except: AnswerId,
    ) -> Result<Vec<Answer>, LedgerStoreError>;

    async fn set_answer_accepted(
        &mut self,
        id: AnswerId,
        accepted: bool,
    ) -> Result<Option<Answer>, LedgerStoreError>;

    /// Appends an immutable entry to the reputation ledger.
    async fn append_reputation_change(
        &mut self,
        change: &NewReputationChange,
    ) -> Result<ReputationChange, LedgerStoreError>;

    /// Atomically adds `delta` to the user's cached reputation and returns the
    /// updated user, or `None` if the user does not exist.
    async fn increment_reputation(
        &mut self,
        user_id: UserId,
        delta: i32,
    ) -> Result<Option<User>, LedgerStoreError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerStoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerStoreError>;
}
