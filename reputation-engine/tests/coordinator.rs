//! End-to-end tests of the vote coordinator over the in-memory ledger store.

use std::sync::Arc;

use reputation_engine::{EngineConfig, EngineError, RepeatVotePolicy, VoteCoordinator};
use reputation_repository::{LedgerStore, MemoryLedgerStore};
use reputation_shared::types::{
    Answer, Question, ReputationChangeKind, User, VotableEntity, VoteTarget,
};

const ASKER: i64 = 1;
const ANSWERER: i64 = 2;
const OTHER_ANSWERER: i64 = 3;
const VOTER: i64 = 4;

const QUESTION: i64 = 10;
const ANSWER: i64 = 20;
const OTHER_ANSWER: i64 = 21;

async fn seeded_store() -> MemoryLedgerStore {
    let store = MemoryLedgerStore::new();
    for (id, username) in [
        (ASKER, "asker"),
        (ANSWERER, "answerer"),
        (OTHER_ANSWERER, "other"),
        (VOTER, "voter"),
    ] {
        store
            .insert_user(User {
                id,
                username: username.to_string(),
                reputation: 0,
            })
            .await;
    }
    store
        .insert_question(Question {
            id: QUESTION,
            author_id: ASKER,
            title: "What does Pin guarantee?".to_string(),
            vote_count: 0,
        })
        .await;
    for (id, author_id) in [(ANSWER, ANSWERER), (OTHER_ANSWER, OTHER_ANSWERER)] {
        store
            .insert_answer(Answer {
                id,
                question_id: QUESTION,
                author_id,
                vote_count: 0,
                is_accepted: false,
            })
            .await;
    }
    store
}

fn test_config() -> EngineConfig {
    EngineConfig::default().with_retry_base_delay_ms(1)
}

async fn setup_with(config: EngineConfig) -> (MemoryLedgerStore, VoteCoordinator) {
    let store = seeded_store().await;
    let coordinator = VoteCoordinator::new(Arc::new(store.clone()), config);
    (store, coordinator)
}

async fn setup() -> (MemoryLedgerStore, VoteCoordinator) {
    setup_with(test_config()).await
}

async fn reputation(store: &MemoryLedgerStore, user_id: i64) -> i32 {
    store.find_user(user_id).await.unwrap().unwrap().reputation
}

async fn question_votes(store: &MemoryLedgerStore) -> i32 {
    store.find_question(QUESTION).await.unwrap().unwrap().vote_count
}

async fn answer_votes(store: &MemoryLedgerStore, id: i64) -> i32 {
    store.find_answer(id).await.unwrap().unwrap().vote_count
}

// ============================================================================
// Voting
// ============================================================================

#[tokio::test]
async fn test_upvote_flip_then_duplicate() {
    let (store, coordinator) = setup().await;
    let target = VoteTarget::Question(QUESTION);

    let updated = coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();
    assert_eq!(updated.vote_count(), 1);
    assert_eq!(reputation(&store, ASKER).await, 10);

    let updated = coordinator.cast_vote(target, VOTER, "downvote").await.unwrap();
    assert_eq!(updated.vote_count(), -1);
    assert_eq!(reputation(&store, ASKER).await, -10);

    let err = coordinator
        .cast_vote(target, VOTER, "downvote")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert_eq!(question_votes(&store).await, -1);
    assert_eq!(reputation(&store, ASKER).await, -10);

    let deltas: Vec<i32> = store
        .reputation_changes()
        .await
        .iter()
        .map(|change| change.delta)
        .collect();
    assert_eq!(deltas, vec![10, -20]);
}

#[tokio::test]
async fn test_answer_votes_weigh_double() {
    let (store, coordinator) = setup().await;
    let target = VoteTarget::Answer(ANSWER);

    let updated = coordinator.cast_vote(target, VOTER, "downvote").await.unwrap();
    assert!(matches!(updated, VotableEntity::Answer(ref a) if a.vote_count == -1));
    assert_eq!(reputation(&store, ANSWERER).await, -20);

    coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();
    assert_eq!(answer_votes(&store, ANSWER).await, 1);
    assert_eq!(reputation(&store, ANSWERER).await, 20);

    let kinds: Vec<ReputationChangeKind> = store
        .reputation_changes()
        .await
        .iter()
        .map(|change| change.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ReputationChangeKind::AnswerDownvoted,
            ReputationChangeKind::AnswerVoteChanged
        ]
    );
}

#[tokio::test]
async fn test_repeated_votes_never_double_count() {
    let (store, coordinator) = setup().await;
    let target = VoteTarget::Answer(ANSWER);

    coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();
    for _ in 0..5 {
        assert!(coordinator.cast_vote(target, VOTER, "upvote").await.is_err());
    }

    assert_eq!(answer_votes(&store, ANSWER).await, 1);
    assert_eq!(reputation(&store, ANSWERER).await, 20);
    assert_eq!(store.votes().await.len(), 1);
}

#[tokio::test]
async fn test_flip_symmetry() {
    let (store, coordinator) = setup().await;
    let target = VoteTarget::Question(QUESTION);

    coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();
    let (count, rep) = (question_votes(&store).await, reputation(&store, ASKER).await);

    coordinator.cast_vote(target, VOTER, "downvote").await.unwrap();
    coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();

    assert_eq!(question_votes(&store).await, count);
    assert_eq!(reputation(&store, ASKER).await, rep);
}

#[tokio::test]
async fn test_vote_kind_is_case_insensitive() {
    let (store, coordinator) = setup().await;
    coordinator
        .cast_vote(VoteTarget::Question(QUESTION), VOTER, "Upvote")
        .await
        .unwrap();
    assert_eq!(question_votes(&store).await, 1);
}

#[tokio::test]
async fn test_invalid_vote_kind_writes_nothing() {
    let (store, coordinator) = setup().await;

    let err = coordinator
        .cast_vote(VoteTarget::Question(QUESTION), VOTER, "sideways")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidVoteKind(ref kind) if kind == "sideways"));
    assert!(store.votes().await.is_empty());
    assert_eq!(question_votes(&store).await, 0);
}

#[tokio::test]
async fn test_missing_target_is_not_found() {
    let (store, coordinator) = setup().await;

    let err = coordinator
        .cast_vote(VoteTarget::Answer(999), VOTER, "upvote")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(err.to_string(), "answer 999 not found");
    assert!(store.votes().await.is_empty());
}

#[tokio::test]
async fn test_unknown_voter_is_not_found() {
    let (store, coordinator) = setup().await;

    let err = coordinator
        .cast_vote(VoteTarget::Question(QUESTION), 404, "upvote")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(err.to_string(), "user 404 not found");
    assert!(store.votes().await.is_empty());
    assert_eq!(question_votes(&store).await, 0);
    assert!(store.reputation_changes().await.is_empty());
}

#[tokio::test]
async fn test_missing_author_keeps_the_vote() {
    let (store, coordinator) = setup().await;
    store.remove_user(ASKER).await;

    let updated = coordinator
        .cast_vote(VoteTarget::Question(QUESTION), VOTER, "upvote")
        .await
        .unwrap();

    assert_eq!(updated.vote_count(), 1);
    assert_eq!(store.votes().await.len(), 1);
    assert!(store.reputation_changes().await.is_empty());
}

#[tokio::test]
async fn test_retract_policy_reverses_the_vote() {
    let config = test_config().with_repeat_vote_policy(RepeatVotePolicy::Retract);
    let (store, coordinator) = setup_with(config).await;
    let target = VoteTarget::Answer(ANSWER);

    coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();
    let updated = coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();

    assert_eq!(updated.vote_count(), 0);
    assert_eq!(reputation(&store, ANSWERER).await, 0);
    assert!(store.votes().await.is_empty());

    let last = store.reputation_changes().await.pop().unwrap();
    assert_eq!(last.kind, ReputationChangeKind::AnswerVoteRetracted);
    assert_eq!(last.delta, -20);

    // A fresh vote is allowed once the previous one is gone.
    coordinator.cast_vote(target, VOTER, "downvote").await.unwrap();
    assert_eq!(answer_votes(&store, ANSWER).await, -1);
    assert_eq!(reputation(&store, ANSWERER).await, -20);
}

// ============================================================================
// Concurrency and retries
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_votes_create_one_vote() {
    let (store, coordinator) = setup().await;
    let target = VoteTarget::Question(QUESTION);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.cast_vote(target, VOTER, "upvote").await })
        })
        .collect();
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(EngineError::Conflict(_))))
    );
    assert_eq!(store.votes().await.len(), 1);
    assert_eq!(question_votes(&store).await, 1);
    assert_eq!(reputation(&store, ASKER).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_voters_all_count() {
    let (store, coordinator) = setup().await;
    for id in 100..110 {
        store
            .insert_user(User {
                id,
                username: format!("voter{id}"),
                reputation: 0,
            })
            .await;
    }

    let votes = (100..110).map(|voter| {
        let coordinator = coordinator.clone();
        async move {
            coordinator
                .cast_vote(VoteTarget::Answer(OTHER_ANSWER), voter, "upvote")
                .await
        }
    });
    for result in futures::future::join_all(votes).await {
        result.unwrap();
    }

    assert_eq!(answer_votes(&store, OTHER_ANSWER).await, 10);
    assert_eq!(reputation(&store, OTHER_ANSWERER).await, 200);
}

#[tokio::test]
async fn test_conflicting_commit_is_retried() {
    let (store, coordinator) = setup().await;
    store.inject_conflicts(1);

    let updated = coordinator
        .cast_vote(VoteTarget::Question(QUESTION), VOTER, "upvote")
        .await
        .unwrap();

    assert_eq!(updated.vote_count(), 1);
    assert_eq!(question_votes(&store).await, 1);
    assert_eq!(reputation(&store, ASKER).await, 10);
}

#[tokio::test]
async fn test_persistent_conflicts_are_transient() {
    let (store, coordinator) = setup_with(test_config().with_max_attempts(3)).await;
    store.inject_conflicts(3);

    let err = coordinator
        .cast_vote(VoteTarget::Question(QUESTION), VOTER, "upvote")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Transient(_)));
    assert!(store.votes().await.is_empty());
    assert_eq!(question_votes(&store).await, 0);
    assert_eq!(reputation(&store, ASKER).await, 0);
}

#[tokio::test]
async fn test_failed_rollback_keeps_the_original_error() {
    let (store, coordinator) = setup().await;
    let target = VoteTarget::Question(QUESTION);
    coordinator.cast_vote(target, VOTER, "upvote").await.unwrap();

    store.inject_rollback_failures(2);
    let err = coordinator.cast_vote(target, VOTER, "upvote").await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let err = coordinator.accept_answer(ANSWER, VOTER).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    assert_eq!(question_votes(&store).await, 1);
    assert!(!store.find_answer(ANSWER).await.unwrap().unwrap().is_accepted);
}

// ============================================================================
// Acceptance
// ============================================================================

#[tokio::test]
async fn test_switching_accepted_answer() {
    let (store, coordinator) = setup().await;

    let accepted = coordinator.accept_answer(ANSWER, ASKER).await.unwrap();
    assert!(accepted.is_accepted);
    assert_eq!(reputation(&store, ANSWERER).await, 15);
    let before = store.reputation_changes().await.len();

    let switched = coordinator.accept_answer(OTHER_ANSWER, ASKER).await.unwrap();
    assert!(switched.is_accepted);

    let mut accepted = Vec::new();
    for id in [ANSWER, OTHER_ANSWER] {
        if store.find_answer(id).await.unwrap().unwrap().is_accepted {
            accepted.push(id);
        }
    }
    assert_eq!(accepted, vec![OTHER_ANSWER]);

    let changes = store.reputation_changes().await;
    let new: Vec<(i64, i32)> = changes[before..]
        .iter()
        .map(|c| (c.user_id, c.delta))
        .collect();
    assert_eq!(new, vec![(ANSWERER, -15), (OTHER_ANSWERER, 15)]);
    assert_eq!(reputation(&store, ANSWERER).await, 0);
    assert_eq!(reputation(&store, OTHER_ANSWERER).await, 15);
}

#[tokio::test]
async fn test_accepting_twice_unaccepts() {
    let (store, coordinator) = setup().await;

    coordinator.accept_answer(ANSWER, ASKER).await.unwrap();
    let answer = coordinator.accept_answer(ANSWER, ASKER).await.unwrap();

    assert!(!answer.is_accepted);
    assert_eq!(reputation(&store, ANSWERER).await, 0);
    let last = store.reputation_changes().await.pop().unwrap();
    assert_eq!(last.kind, ReputationChangeKind::AnswerUnaccepted);
    assert_eq!(last.description, "answer unaccepted");
}

#[tokio::test]
async fn test_only_question_author_accepts() {
    let (store, coordinator) = setup().await;

    let err = coordinator.accept_answer(ANSWER, VOTER).await.unwrap_err();

    assert!(matches!(err, EngineError::Forbidden(_)));
    assert!(!store.find_answer(ANSWER).await.unwrap().unwrap().is_accepted);
    assert!(store.reputation_changes().await.is_empty());
}

#[tokio::test]
async fn test_accepting_missing_answer() {
    let (_store, coordinator) = setup().await;
    assert!(matches!(
        coordinator.accept_answer(404, ASKER).await,
        Err(EngineError::NotFound(_))
    ));
}

// ============================================================================
// Ledger
// ============================================================================

#[tokio::test]
async fn test_ledger_reconstructs_reputation() {
    let (_store, coordinator) = setup().await;

    coordinator
        .cast_vote(VoteTarget::Answer(ANSWER), VOTER, "upvote")
        .await
        .unwrap();
    coordinator
        .cast_vote(VoteTarget::Answer(ANSWER), ASKER, "downvote")
        .await
        .unwrap();
    coordinator.accept_answer(ANSWER, ASKER).await.unwrap();

    let audit = coordinator.ledger().audit(ANSWERER).await.unwrap();
    assert_eq!(audit.cached, 15);
    assert_eq!(audit.ledger_total, 15);
    assert!(audit.consistent);
    assert_eq!(coordinator.ledger().history(ANSWERER).await.unwrap().len(), 3);
}
