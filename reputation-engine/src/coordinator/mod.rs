//! Transactional entry point for votes and answer acceptance.
//!
//! The vote record and the target's `vote_count` commit together in one
//! storage transaction. Reputation is applied afterwards in its own
//! transaction, and a failure there is logged without undoing the vote.
mod retry;

use std::sync::Arc;

use reputation_repository::{LedgerStore, LedgerTransaction};
use reputation_shared::types::{
    Answer, AnswerId, NewReputationChange, ParseVoteKindError, UserId, VotableEntity, Vote,
    VoteKind, VoteTarget,
};
use tracing::{info, instrument, warn};

use crate::acceptance::AcceptanceStateMachine;
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::reputation::ReputationLedger;
use crate::voting::{VoteEffects, VoteStateMachine, VoteWrite};

use self::retry::retry_conflicts;

#[derive(Clone)]
pub struct VoteCoordinator {
    store: Arc<dyn LedgerStore>,
    config: EngineConfig,
    votes: VoteStateMachine,
    acceptance: AcceptanceStateMachine,
    ledger: ReputationLedger,
}

impl VoteCoordinator {
    pub fn new(store: Arc<dyn LedgerStore>, config: EngineConfig) -> Self {
        Self {
            votes: VoteStateMachine::new(config.repeat_vote_policy),
            acceptance: AcceptanceStateMachine::new(store.clone()),
            ledger: ReputationLedger::new(store.clone()),
            store,
            config,
        }
    }

    pub fn ledger(&self) -> &ReputationLedger {
        &self.ledger
    }

    /// Casts `requested_kind` ("upvote" or "downvote") on `target` for
    /// `voter_id` and returns the target with its updated `vote_count`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the target or the voter does not exist
    /// - [`EngineError::InvalidVoteKind`] if `requested_kind` is not a vote kind
    /// - [`EngineError::Conflict`] if the voter already holds this vote and
    ///   repeats are rejected
    /// - [`EngineError::Transient`] if the transaction kept losing races
    #[instrument(skip(self))]
    pub async fn cast_vote(
        &self,
        target: VoteTarget,
        voter_id: UserId,
        requested_kind: &str,
    ) -> Result<VotableEntity, EngineError> {
        if self.store.find_votable(target).await?.is_none() {
            return Err(EngineError::not_found(target.to_string()));
        }
        if self.store.find_user(voter_id).await?.is_none() {
            return Err(EngineError::not_found(format!("user {voter_id}")));
        }
        let kind: VoteKind = requested_kind
            .parse()
            .map_err(|e: ParseVoteKindError| EngineError::InvalidVoteKind(e.0))?;

        let (updated, effects) = retry_conflicts(&self.config, "cast_vote", move || {
            self.cast_vote_once(target, voter_id, kind)
        })
        .await?;

        info!(
            transition = ?effects.transition,
            vote_count = updated.vote_count(),
            "Vote recorded"
        );

        self.apply_reputation(NewReputationChange {
            user_id: updated.author_id(),
            kind: effects.reputation.kind,
            delta: effects.reputation.delta,
            description: effects.reputation.description,
        })
        .await;

        Ok(updated)
    }

    /// Toggles acceptance of an answer on behalf of the question author and
    /// returns the answer as stored afterwards.
    #[instrument(skip(self))]
    pub async fn accept_answer(
        &self,
        answer_id: AnswerId,
        requesting_user: UserId,
    ) -> Result<Answer, EngineError> {
        let outcome = retry_conflicts(&self.config, "accept_answer", move || {
            self.acceptance.accept(answer_id, requesting_user)
        })
        .await?;

        for change in outcome.reputation_changes {
            self.apply_reputation(change).await;
        }
        Ok(outcome.answer)
    }

    async fn cast_vote_once(
        &self,
        target: VoteTarget,
        voter_id: UserId,
        kind: VoteKind,
    ) -> Result<(VotableEntity, VoteEffects), EngineError> {
        let mut tx = self.store.begin().await?;
        match self.write_vote(&mut *tx, target, voter_id, kind).await {
            Ok(written) => {
                tx.commit().await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback of vote transaction failed");
                }
                Err(e)
            }
        }
    }

    async fn write_vote(
        &self,
        tx: &mut dyn LedgerTransaction,
        target: VoteTarget,
        voter_id: UserId,
        kind: VoteKind,
    ) -> Result<(VotableEntity, VoteEffects), EngineError> {
        let existing = tx.find_vote(voter_id, target).await?.map(|vote| vote.kind);
        let effects = self.votes.plan(target.target_type(), existing, kind)?;

        match effects.write {
            VoteWrite::Insert(kind) => {
                tx.insert_vote(&Vote {
                    voter_id,
                    target,
                    kind,
                })
                .await?
            }
            VoteWrite::UpdateKind(kind) => tx.update_vote_kind(voter_id, target, kind).await?,
            VoteWrite::Delete => tx.delete_vote(voter_id, target).await?,
        }

        let updated = tx
            .increment_vote_count(target, effects.vote_count_delta)
            .await?
            .ok_or_else(|| EngineError::not_found(target.to_string()))?;
        Ok((updated, effects))
    }

    /// Applies a reputation change, retrying conflicts. Failures are logged
    /// and swallowed.
    async fn apply_reputation(&self, change: NewReputationChange) {
        let change = &change;
        let result = retry_conflicts(&self.config, "apply_reputation", move || {
            self.ledger.apply(change)
        })
        .await;

        if let Err(e) = result {
            warn!(
                user_id = change.user_id,
                kind = %change.kind,
                delta = change.delta,
                error = %e,
                "Reputation change not applied"
            );
        }
    }
}
