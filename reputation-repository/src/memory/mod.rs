//! In-memory implementation of the ledger store.
//!
//! Transactions hold an exclusive lock over the whole store and work on a
//! private copy of the state, which is swapped in on commit. This gives
//! serializable behaviour with the same constraint checks as the PostgreSQL
//! schema (vote uniqueness, one accepted answer per question). Used by tests
//! and by local runs without a database.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use reputation_shared::types::{
    Answer, AnswerId, NewReputationChange, Question, QuestionId, ReputationChange, User, UserId,
    VotableEntity, Vote, VoteKind, VoteTarget,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{LedgerStore, LedgerStoreError, LedgerTransaction};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    questions: BTreeMap<QuestionId, Question>,
    answers: BTreeMap<AnswerId, Answer>,
    votes: HashMap<(UserId, VoteTarget), VoteKind>,
    reputation_changes: Vec<ReputationChange>,
}

impl MemoryState {
    fn votable(&self, target: VoteTarget) -> Option<VotableEntity> {
        match target {
            VoteTarget::Question(id) => self.questions.get(&id).cloned().map(VotableEntity::Question),
            VoteTarget::Answer(id) => self.answers.get(&id).cloned().map(VotableEntity::Answer),
        }
    }
}

/// Ledger store kept entirely in process memory.
///
/// Cloning the store yields another handle onto the same data.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    injected_conflicts: Arc<AtomicUsize>,
    injected_rollback_failures: Arc<AtomicUsize>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user. Users are owned by the account service; this
    /// is how fixtures and local runs seed them.
    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_question(&self, question: Question) {
        self.state.lock().await.questions.insert(question.id, question);
    }

    pub async fn insert_answer(&self, answer: Answer) {
        self.state.lock().await.answers.insert(answer.id, answer);
    }

    /// Removes a user, leaving their content and votes in place.
    pub async fn remove_user(&self, id: UserId) {
        self.state.lock().await.users.remove(&id);
    }

    /// Snapshot of every stored vote.
    pub async fn votes(&self) -> Vec<Vote> {
        self.state
            .lock()
            .await
            .votes
            .iter()
            .map(|(&(voter_id, target), &kind)| Vote {
                voter_id,
                target,
                kind,
            })
            .collect()
    }

    /// Snapshot of the whole reputation ledger, in append order.
    pub async fn reputation_changes(&self) -> Vec<ReputationChange> {
        self.state.lock().await.reputation_changes.clone()
    }

    /// Makes the next `count` commits fail with a `TransactionConflict`,
    /// simulating a lost race against another writer.
    pub fn inject_conflicts(&self, count: usize) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` transactions fail their rollback with a
    /// `DatabaseError`. Their writes are discarded all the same.
    pub fn inject_rollback_failures(&self, count: usize) {
        self.injected_rollback_failures.store(count, Ordering::SeqCst);
    }

    fn take_injected_conflict(&self) -> bool {
        take_one(&self.injected_conflicts)
    }

    fn take_injected_rollback_failure(&self) -> bool {
        take_one(&self.injected_rollback_failures)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, LedgerStoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryLedgerTransaction {
            guard,
            working,
            fail_commit: self.take_injected_conflict(),
            fail_rollback: self.take_injected_rollback_failure(),
        }))
    }

    async fn find_question(&self, id: QuestionId) -> Result<Option<Question>, LedgerStoreError> {
        Ok(self.state.lock().await.questions.get(&id).cloned())
    }

    async fn find_answer(&self, id: AnswerId) -> Result<Option<Answer>, LedgerStoreError> {
        Ok(self.state.lock().await.answers.get(&id).cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerStoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_vote(
        &self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<Option<Vote>, LedgerStoreError> {
        Ok(self
            .state
            .lock()
            .await
            .votes
            .get(&(voter_id, target))
            .map(|&kind| Vote {
                voter_id,
                target,
                kind,
            }))
    }

    async fn reputation_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReputationChange>, LedgerStoreError> {
        Ok(self
            .state
            .lock()
            .await
            .reputation_changes
            .iter()
            .filter(|change| change.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Transaction over a [`MemoryLedgerStore`].
pub struct MemoryLedgerTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
    fail_rollback: bool,
}

#[async_trait]
impl LedgerTransaction for MemoryLedgerTransaction {
    async fn find_vote(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<Option<Vote>, LedgerStoreError> {
        Ok(self.working.votes.get(&(voter_id, target)).map(|&kind| Vote {
            voter_id,
            target,
            kind,
        }))
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<(), LedgerStoreError> {
        let key = (vote.voter_id, vote.target);
        if self.working.votes.contains_key(&key) {
            return Err(LedgerStoreError::conflict(format!(
                "vote of user {} on {} already exists",
                vote.voter_id, vote.target
            )));
        }
        self.working.votes.insert(key, vote.kind);
        Ok(())
    }

    async fn update_vote_kind(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
        kind: VoteKind,
    ) -> Result<(), LedgerStoreError> {
        match self.working.votes.get_mut(&(voter_id, target)) {
            Some(stored) => {
                *stored = kind;
                Ok(())
            }
            None => Err(LedgerStoreError::conflict(format!(
                "vote of user {voter_id} on {target} disappeared during update"
            ))),
        }
    }

    async fn delete_vote(
        &mut self,
        voter_id: UserId,
        target: VoteTarget,
    ) -> Result<(), LedgerStoreError> {
        match self.working.votes.remove(&(voter_id, target)) {
            Some(_) => Ok(()),
            None => Err(LedgerStoreError::conflict(format!(
                "vote of user {voter_id} on {target} disappeared during delete"
            ))),
        }
    }

    async fn increment_vote_count(
        &mut self,
        target: VoteTarget,
        delta: i32,
    ) -> Result<Option<VotableEntity>, LedgerStoreError> {
        match target {
            VoteTarget::Question(id) => {
                if let Some(question) = self.working.questions.get_mut(&id) {
                    question.vote_count += delta;
                }
            }
            VoteTarget::Answer(id) => {
                if let Some(answer) = self.working.answers.get_mut(&id) {
                    answer.vote_count += delta;
                }
            }
        }
        Ok(self.working.votable(target))
    }

    async fn lock_question(
        &mut self,
        id: QuestionId,
    ) -> Result<Option<Question>, LedgerStoreError> {
        Ok(self.working.questions.get(&id).cloned())
    }

    async fn find_answer(&mut self, id: AnswerId) -> Result<Option<Answer>, LedgerStoreError> {
        Ok(self.working.answers.get(&id).cloned())
    }

    async fn clear_accepted_answers(
        &mut self,
        question_id: QuestionId,
        except: AnswerId,
    ) -> Result<Vec<Answer>, LedgerStoreError> {
        let mut cleared = Vec::new();
        for answer in self.working.answers.values_mut() {
            if answer.question_id == question_id && answer.id != except && answer.is_accepted {
                answer.is_accepted = false;
                cleared.push(answer.clone());
            }
        }
        Ok(cleared)
    }

    async fn set_answer_accepted(
        &mut self,
        id: AnswerId,
        accepted: bool,
    ) -> Result<Option<Answer>, LedgerStoreError> {
        let Some(question_id) = self.working.answers.get(&id).map(|a| a.question_id) else {
            return Ok(None);
        };

        if accepted {
            let other_accepted = self
                .working
                .answers
                .values()
                .any(|a| a.question_id == question_id && a.id != id && a.is_accepted);
            if other_accepted {
                return Err(LedgerStoreError::conflict(format!(
                    "question {question_id} already has an accepted answer"
                )));
            }
        }

        let answer = self.working.answers.get_mut(&id).map(|answer| {
            answer.is_accepted = accepted;
            answer.clone()
        });
        Ok(answer)
    }

    async fn append_reputation_change(
        &mut self,
        change: &NewReputationChange,
    ) -> Result<ReputationChange, LedgerStoreError> {
        let id = self.working.reputation_changes.len() as i64 + 1;
        let entry = ReputationChange {
            id,
            user_id: change.user_id,
            kind: change.kind,
            delta: change.delta,
            description: change.description.clone(),
            created_at: Utc::now(),
        };
        self.working.reputation_changes.push(entry.clone());
        Ok(entry)
    }

    async fn increment_reputation(
        &mut self,
        user_id: UserId,
        delta: i32,
    ) -> Result<Option<User>, LedgerStoreError> {
        Ok(self.working.users.get_mut(&user_id).map(|user| {
            user.reputation += delta;
            user.clone()
        }))
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerStoreError> {
        let MemoryLedgerTransaction {
            mut guard,
            working,
            fail_commit,
            ..
        } = *self;
        if fail_commit {
            return Err(LedgerStoreError::conflict("injected commit conflict"));
        }
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerStoreError> {
        if self.fail_rollback {
            return Err(LedgerStoreError::DatabaseError(sqlx::Error::Protocol(
                "injected rollback failure".to_string(),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputation_shared::types::ReputationChangeKind;

    fn user(id: UserId) -> User {
        User {
            id,
            username: format!("user-{id}"),
            reputation: 0,
        }
    }

    fn question(id: QuestionId, author_id: UserId) -> Question {
        Question {
            id,
            author_id,
            title: format!("question {id}"),
            vote_count: 0,
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = MemoryLedgerStore::new();
        store.insert_user(user(1)).await;
        store.insert_question(question(10, 1)).await;

        let mut tx = store.begin().await.unwrap();
        let vote = Vote {
            voter_id: 1,
            target: VoteTarget::Question(10),
            kind: VoteKind::Up,
        };
        tx.insert_vote(&vote).await.unwrap();
        tx.increment_vote_count(VoteTarget::Question(10), 1).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(store.votes().await.is_empty());
        assert_eq!(store.find_question(10).await.unwrap().unwrap().vote_count, 0);
    }

    #[tokio::test]
    async fn duplicate_vote_insert_is_a_conflict() {
        let store = MemoryLedgerStore::new();
        let vote = Vote {
            voter_id: 1,
            target: VoteTarget::Answer(5),
            kind: VoteKind::Down,
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_vote(&vote).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_vote(&vote).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn second_accepted_answer_is_rejected() {
        let store = MemoryLedgerStore::new();
        for id in [1, 2] {
            store
                .insert_answer(Answer {
                    id,
                    question_id: 7,
                    author_id: id,
                    vote_count: 0,
                    is_accepted: id == 1,
                })
                .await;
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.set_answer_accepted(2, true).await.unwrap_err().is_conflict());

        let cleared = tx.clear_accepted_answers(7, 2).await.unwrap();
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].id, 1);
        assert!(tx.set_answer_accepted(2, true).await.unwrap().unwrap().is_accepted);
    }

    #[tokio::test]
    async fn injected_conflict_fails_one_commit() {
        let store = MemoryLedgerStore::new();
        store.insert_user(user(3)).await;
        store.inject_conflicts(1);

        let mut tx = store.begin().await.unwrap();
        tx.append_reputation_change(&NewReputationChange {
            user_id: 3,
            kind: ReputationChangeKind::AnswerAccepted,
            delta: 15,
            description: "answer accepted".to_string(),
        })
        .await
        .unwrap();
        assert!(tx.commit().await.unwrap_err().is_conflict());
        assert!(store.reputation_changes().await.is_empty());

        let tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn injected_rollback_failure_still_discards_writes() {
        let store = MemoryLedgerStore::new();
        store.insert_question(question(10, 1)).await;
        store.inject_rollback_failures(1);

        let mut tx = store.begin().await.unwrap();
        tx.increment_vote_count(VoteTarget::Question(10), 1).await.unwrap();
        assert!(matches!(
            tx.rollback().await,
            Err(LedgerStoreError::DatabaseError(_))
        ));
        assert_eq!(store.find_question(10).await.unwrap().unwrap().vote_count, 0);

        let tx = store.begin().await.unwrap();
        tx.rollback().await.unwrap();
    }
}
