//! Integration tests of the vote coordinator over PostgreSQL.
//!
//! These tests require a real PostgreSQL database reachable through
//! `DATABASE_URL` and use SQLx test macros for isolation and cleanup.
//!
//! Run with: `cargo test --test postgres_coordinator -- --ignored`

use std::sync::Arc;

use reputation_engine::{EngineConfig, EngineError, VoteCoordinator};
use reputation_repository::{LedgerStore, PostgresLedgerStore};
use reputation_shared::types::VoteTarget;

const ASKER: i64 = 1;
const ANSWERER: i64 = 2;
const OTHER_ANSWERER: i64 = 3;
const VOTER: i64 = 4;

const QUESTION: i64 = 10;
const ANSWER: i64 = 20;
const OTHER_ANSWER: i64 = 21;

/// Seeds four users, one question by the asker and one answer by each
/// answerer.
async fn seed(pool: &sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO users (id, username) \
         VALUES (1, 'asker'), (2, 'answerer'), (3, 'other'), (4, 'voter')",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO questions (id, author_id, title) VALUES (10, 1, 'Why is Send auto?')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO answers (id, question_id, author_id) VALUES (20, 10, 2), (21, 10, 3)")
        .execute(pool)
        .await
        .unwrap();
}

async fn setup(pool: sqlx::PgPool) -> (Arc<PostgresLedgerStore>, VoteCoordinator) {
    seed(&pool).await;
    let store = Arc::new(PostgresLedgerStore::new(pool).await.unwrap());
    let config = EngineConfig::default()
        .with_max_attempts(5)
        .with_retry_base_delay_ms(1);
    let coordinator = VoteCoordinator::new(store.clone(), config);
    (store, coordinator)
}

async fn vote_rows(pool: &sqlx::PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM votes")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Voting
// ============================================================================

#[sqlx::test(migrator = "reputation_repository::postgres::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_racing_first_votes_record_one_vote(pool: sqlx::PgPool) {
    let (store, coordinator) = setup(pool.clone()).await;
    let target = VoteTarget::Question(QUESTION);

    let handles: Vec<_> = (0..8)
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
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(EngineError::Conflict(_))))
    );
    assert_eq!(vote_rows(&pool).await, 1);
    assert_eq!(store.find_question(QUESTION).await.unwrap().unwrap().vote_count, 1);

    let audit = coordinator.ledger().audit(ASKER).await.unwrap();
    assert_eq!(audit.cached, 10);
    assert!(audit.consistent);
}

#[sqlx::test(migrator = "reputation_repository::postgres::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_unknown_voter_is_not_found(pool: sqlx::PgPool) {
    let (store, coordinator) = setup(pool.clone()).await;

    let err = coordinator
        .cast_vote(VoteTarget::Answer(ANSWER), 404, "upvote")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(err.to_string(), "user 404 not found");
    assert_eq!(vote_rows(&pool).await, 0);
    assert_eq!(store.find_answer(ANSWER).await.unwrap().unwrap().vote_count, 0);
}

// ============================================================================
// Acceptance
// ============================================================================

#[sqlx::test(migrator = "reputation_repository::postgres::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_racing_accepts_keep_one_accepted_answer(pool: sqlx::PgPool) {
    let (store, coordinator) = setup(pool.clone()).await;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let coordinator = coordinator.clone();
            let answer_id = if i % 2 == 0 { ANSWER } else { OTHER_ANSWER };
            tokio::spawn(async move { coordinator.accept_answer(answer_id, ASKER).await })
        })
        .collect();
    for joined in futures::future::join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let accepted: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE question_id = $1 AND is_accepted")
            .bind(QUESTION)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(accepted <= 1);

    for (answer_id, author_id) in [(ANSWER, ANSWERER), (OTHER_ANSWER, OTHER_ANSWERER)] {
        let answer = store.find_answer(answer_id).await.unwrap().unwrap();
        let audit = coordinator.ledger().audit(author_id).await.unwrap();
        assert!(audit.consistent);
        assert_eq!(audit.cached, if answer.is_accepted { 15 } else { 0 });
    }
}
