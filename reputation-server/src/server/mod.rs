//! HTTP server setup and routing.
pub mod handlers;
pub mod state;

use std::net::SocketAddr;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::errors::ServerError;

pub use self::handlers::{CALLER_HEADER, Caller};
pub use self::state::AppState;

/// Builds the router with every route and middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/questions/:id/vote", post(handlers::vote_on_question))
        .route("/answers/:id/vote", post(handlers::vote_on_answer))
        .route("/answers/:id/accept", post(handlers::accept_answer))
        .route("/users/:id/reputation", get(handlers::user_reputation))
        .route("/health", get(handlers::health_check))
        .layer(create_cors_layer())
        .with_state(state)
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(CALLER_HEADER)])
}

/// Serves `app` on `addr` until shutdown is requested with Ctrl-C.
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
