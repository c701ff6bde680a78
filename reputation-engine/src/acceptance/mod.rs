//! Answer acceptance.
//!
//! The author of a question designates at most one of its answers as
//! accepted. Accepting an already accepted answer takes the acceptance back.
use std::sync::Arc;

use reputation_repository::{LedgerStore, LedgerTransaction};
use reputation_shared::types::{
    Answer, AnswerId, NewReputationChange, ReputationChangeKind, UserId,
};
use tracing::{info, instrument, warn};

use crate::errors::EngineError;
use crate::voting::policy::ACCEPTED_ANSWER_REPUTATION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceTransition {
    Accept,
    Unaccept,
}

impl AcceptanceTransition {
    pub fn decide(answer: &Answer) -> Self {
        if answer.is_accepted {
            Self::Unaccept
        } else {
            Self::Accept
        }
    }
}

/// Committed result of an acceptance toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceOutcome {
    pub transition: AcceptanceTransition,
    pub answer: Answer,
    /// Reputation owed to answer authors, in the order the flags changed.
    pub reputation_changes: Vec<NewReputationChange>,
}

#[derive(Clone)]
pub struct AcceptanceStateMachine {
    store: Arc<dyn LedgerStore>,
}

impl AcceptanceStateMachine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Toggles acceptance of `answer_id` on behalf of `requesting_user`.
    ///
    /// Flag changes commit in one transaction under the parent question's
    /// lock. The returned reputation changes have not been applied yet.
    #[instrument(skip(self))]
    pub async fn accept(
        &self,
        answer_id: AnswerId,
        requesting_user: UserId,
    ) -> Result<AcceptanceOutcome, EngineError> {
        let mut tx = self.store.begin().await?;
        match Self::toggle(&mut *tx, answer_id, requesting_user).await {
            Ok(outcome) => {
                tx.commit().await?;
                info!(
                    answer_id,
                    transition = ?outcome.transition,
                    "Answer acceptance toggled"
                );
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(answer_id, error = %rollback, "Rollback of acceptance failed");
                }
                Err(e)
            }
        }
    }

    async fn toggle(
        tx: &mut dyn LedgerTransaction,
        answer_id: AnswerId,
        requesting_user: UserId,
    ) -> Result<AcceptanceOutcome, EngineError> {
        let answer = tx
            .find_answer(answer_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("answer {answer_id}")))?;
        let question = tx
            .lock_question(answer.question_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("question {}", answer.question_id)))?;

        if question.author_id != requesting_user {
            return Err(EngineError::forbidden(format!(
                "only the author of question {} can accept its answers",
                question.id
            )));
        }

        // Read again now that the question lock serializes acceptance.
        let answer = tx
            .find_answer(answer_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("answer {answer_id}")))?;

        let transition = AcceptanceTransition::decide(&answer);
        let mut reputation_changes = Vec::new();

        let updated = match transition {
            AcceptanceTransition::Unaccept => tx.set_answer_accepted(answer.id, false).await?,
            AcceptanceTransition::Accept => {
                for cleared in tx.clear_accepted_answers(question.id, answer.id).await? {
                    reputation_changes.push(unaccepted(&cleared));
                }
                tx.set_answer_accepted(answer.id, true).await?
            }
        }
        .ok_or_else(|| EngineError::not_found(format!("answer {answer_id}")))?;

        reputation_changes.push(match transition {
            AcceptanceTransition::Accept => NewReputationChange {
                user_id: updated.author_id,
                kind: ReputationChangeKind::AnswerAccepted,
                delta: ACCEPTED_ANSWER_REPUTATION,
                description: "answer accepted".to_string(),
            },
            AcceptanceTransition::Unaccept => unaccepted(&updated),
        });

        Ok(AcceptanceOutcome {
            transition,
            answer: updated,
            reputation_changes,
        })
    }
}

fn unaccepted(answer: &Answer) -> NewReputationChange {
    NewReputationChange {
        user_id: answer.author_id,
        kind: ReputationChangeKind::AnswerUnaccepted,
        delta: -ACCEPTED_ANSWER_REPUTATION,
        description: "answer unaccepted".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputation_repository::MemoryLedgerStore;
    use reputation_shared::types::Question;

    async fn fixture() -> (MemoryLedgerStore, AcceptanceStateMachine) {
        let store = MemoryLedgerStore::new();
        store
            .insert_question(Question {
                id: 1,
                author_id: 100,
                title: "Why does the borrow checker complain?".to_string(),
                vote_count: 0,
            })
            .await;
        for (id, author_id) in [(10, 200), (11, 201)] {
            store
                .insert_answer(Answer {
                    id,
                    question_id: 1,
                    author_id,
                    vote_count: 0,
                    is_accepted: false,
                })
                .await;
        }
        let machine = AcceptanceStateMachine::new(Arc::new(store.clone()));
        (store, machine)
    }

    #[test]
    fn decide_toggles() {
        let mut answer = Answer {
            id: 1,
            question_id: 1,
            author_id: 1,
            vote_count: 0,
            is_accepted: false,
        };
        assert_eq!(AcceptanceTransition::decide(&answer), AcceptanceTransition::Accept);
        answer.is_accepted = true;
        assert_eq!(AcceptanceTransition::decide(&answer), AcceptanceTransition::Unaccept);
    }

    #[tokio::test]
    async fn accept_then_unaccept() {
        let (store, machine) = fixture().await;

        let accepted = machine.accept(10, 100).await.unwrap();
        assert!(accepted.answer.is_accepted);
        assert_eq!(accepted.reputation_changes.len(), 1);
        assert_eq!(accepted.reputation_changes[0].user_id, 200);
        assert_eq!(accepted.reputation_changes[0].delta, 15);

        let unaccepted = machine.accept(10, 100).await.unwrap();
        assert_eq!(unaccepted.transition, AcceptanceTransition::Unaccept);
        assert!(!unaccepted.answer.is_accepted);
        assert_eq!(unaccepted.reputation_changes[0].delta, -15);
        assert_eq!(unaccepted.reputation_changes[0].description, "answer unaccepted");
        assert!(!store.find_answer(10).await.unwrap().unwrap().is_accepted);
    }

    #[tokio::test]
    async fn switching_clears_previous_answer() {
        let (store, machine) = fixture().await;
        machine.accept(10, 100).await.unwrap();

        let outcome = machine.accept(11, 100).await.unwrap();
        let changes: Vec<(UserId, i32)> = outcome
            .reputation_changes
            .iter()
            .map(|c| (c.user_id, c.delta))
            .collect();
        assert_eq!(changes, vec![(200, -15), (201, 15)]);
        assert!(!store.find_answer(10).await.unwrap().unwrap().is_accepted);
        assert!(store.find_answer(11).await.unwrap().unwrap().is_accepted);
    }

    #[tokio::test]
    async fn only_question_author_may_accept() {
        let (store, machine) = fixture().await;
        let err = machine.accept(10, 200).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
        assert!(!store.find_answer(10).await.unwrap().unwrap().is_accepted);
    }

    #[tokio::test]
    async fn missing_answer() {
        let (_store, machine) = fixture().await;
        assert!(matches!(
            machine.accept(404, 100).await,
            Err(EngineError::NotFound(_))
        ));
    }
}
