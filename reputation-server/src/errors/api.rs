use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reputation_engine::{EngineError, ErrorKind};
use tracing::error;

/// Errors returned to HTTP callers as `{ "kind", "message" }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The request did not carry a usable caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Engine(e) => match e.kind() {
                ErrorKind::NotFound | ErrorKind::UserNotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidVoteKind => StatusCode::BAD_REQUEST,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::Engine(e) => serde_json::json!(e.report()),
            Self::Unauthorized(_) => serde_json::json!({
                "kind": "unauthorized",
                "message": self.to_string(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
