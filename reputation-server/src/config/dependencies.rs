//! Settings and dependency wiring for the reputation server.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use reputation_engine::{EngineConfig, RepeatVotePolicy, VoteCoordinator};
use reputation_repository::PostgresLedgerStore;
use tracing::{info, warn};

use crate::errors::ServerError;

/// Default maximum size of the PostgreSQL pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Default listen address.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub run_migrations: bool,
    pub engine: EngineConfig,
}

impl Settings {
    /// Reads settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 20)
    /// - `BIND_ADDR`: listen address (default: 127.0.0.1:8080)
    /// - `VOTE_MAX_ATTEMPTS`: attempts per conflicting transaction (default: 3)
    /// - `VOTE_RETRY_BASE_DELAY_MS`: backoff base in milliseconds (default: 10)
    /// - `REPEAT_VOTE_POLICY`: "reject" or "retract" (default: reject)
    /// - `RUN_MIGRATIONS`: apply embedded migrations on start (default: true)
    pub fn from_env() -> Result<Self, ServerError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ServerError::config("DATABASE_URL must be set"))?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ServerError::config(format!("Invalid BIND_ADDR: {e}")))?;

        let defaults = EngineConfig::default();
        let engine = EngineConfig::default()
            .with_max_attempts(parse_or("VOTE_MAX_ATTEMPTS", defaults.max_attempts).max(1))
            .with_retry_base_delay_ms(parse_or(
                "VOTE_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay_ms,
            ))
            .with_repeat_vote_policy(repeat_vote_policy_from_env());

        Ok(Self {
            database_url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            bind_addr,
            run_migrations: parse_or("RUN_MIGRATIONS", true),
            engine,
        })
    }
}

/// Parses `key`, falling back to `default` when it is unset or invalid.
fn parse_or<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn repeat_vote_policy_from_env() -> RepeatVotePolicy {
    match env::var("REPEAT_VOTE_POLICY") {
        Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
            warn!(error = %e, "Invalid REPEAT_VOTE_POLICY, defaulting to 'reject'");
            RepeatVotePolicy::Reject
        }),
        Err(_) => RepeatVotePolicy::default(),
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub settings: Settings,
    pub coordinator: Arc<VoteCoordinator>,
}

impl Dependencies {
    /// Connects to PostgreSQL, applies migrations when enabled, and builds the
    /// vote coordinator.
    pub async fn new() -> Result<Self, ServerError> {
        let settings = Settings::from_env()?;

        info!(
            bind_addr = %settings.bind_addr,
            max_connections = settings.max_connections,
            max_attempts = settings.engine.max_attempts,
            repeat_vote_policy = ?settings.engine.repeat_vote_policy,
            "Initializing dependencies"
        );

        let store =
            PostgresLedgerStore::connect(&settings.database_url, settings.max_connections).await?;
        if settings.run_migrations {
            store.migrate().await?;
            info!("Database migrations applied");
        }

        let coordinator = Arc::new(VoteCoordinator::new(
            Arc::new(store),
            settings.engine.clone(),
        ));

        Ok(Self {
            settings,
            coordinator,
        })
    }
}
