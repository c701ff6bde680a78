//! Reputation Server Main Entry Point
//!
//! Serves vote casting, answer acceptance and reputation audits over HTTP,
//! backed by PostgreSQL.

use dotenv::dotenv;
use reputation_server::server::{AppState, create_app, run_server};
use reputation_server::{Dependencies, ServerError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reputation_server=info,reputation_engine=info"));

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| ServerError::Tracing(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| ServerError::Tracing(e.to_string()))?;
    }

    info!(
        service_name = "reputation-server",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting reputation server");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let app = create_app(AppState {
        coordinator: deps.coordinator,
    });

    if let Err(e) = run_server(app, deps.settings.bind_addr).await {
        error!(error = %e, "Server failed");
        return Err(e);
    }
    info!("Server stopped");
    Ok(())
}
