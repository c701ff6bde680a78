//! HTTP request handlers.
use axum::{
    Json,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
};
use reputation_engine::ReputationStatement;
use reputation_shared::types::{
    Answer, AnswerId, QuestionId, UserId, VotableEntity, VoteTarget,
};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::server::state::AppState;

/// Header carrying the authenticated caller's user id, set by the upstream
/// authentication layer.
pub const CALLER_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {CALLER_HEADER} header")))?;
        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .map(Caller)
            .ok_or_else(|| ApiError::Unauthorized(format!("malformed {CALLER_HEADER} header")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    /// "upvote" or "downvote".
    pub vote_type: String,
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn vote_on_question(
    State(state): State<AppState>,
    Caller(voter_id): Caller,
    Path(id): Path<QuestionId>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VotableEntity>, ApiError> {
    let updated = state
        .coordinator
        .cast_vote(VoteTarget::Question(id), voter_id, &request.vote_type)
        .await?;
    Ok(Json(updated))
}

pub async fn vote_on_answer(
    State(state): State<AppState>,
    Caller(voter_id): Caller,
    Path(id): Path<AnswerId>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VotableEntity>, ApiError> {
    let updated = state
        .coordinator
        .cast_vote(VoteTarget::Answer(id), voter_id, &request.vote_type)
        .await?;
    Ok(Json(updated))
}

pub async fn accept_answer(
    State(state): State<AppState>,
    Caller(requesting_user): Caller,
    Path(id): Path<AnswerId>,
) -> Result<Json<Answer>, ApiError> {
    let answer = state.coordinator.accept_answer(id, requesting_user).await?;
    Ok(Json(answer))
}

/// Cached reputation, its audit against the ledger, and the ledger itself.
pub async fn user_reputation(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<ReputationStatement>, ApiError> {
    let statement = state.coordinator.ledger().statement(id).await?;
    Ok(Json(statement))
}
