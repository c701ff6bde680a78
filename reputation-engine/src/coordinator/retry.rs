use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::EngineError;

/// Delays between attempts of a transaction that lost a race.
fn backoff(config: &EngineConfig) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(config.retry_base_delay_ms)
        .factor(2)
        .max_delay(config.retry_max_delay)
        .map(jitter)
        .take(config.retries())
}

/// Runs `action` until it succeeds or fails with an error that is not a
/// storage conflict. Conflicts that outlast every retry become
/// [`EngineError::Transient`].
pub(crate) async fn retry_conflicts<T, A, F>(
    config: &EngineConfig,
    operation: &'static str,
    action: A,
) -> Result<T, EngineError>
where
    A: FnMut() -> F,
    F: Future<Output = Result<T, EngineError>>,
{
    let condition = |e: &EngineError| {
        let retry = e.is_retryable();
        if retry {
            debug!(operation, error = %e, "Transaction conflict, retrying");
        }
        retry
    };

    RetryIf::start(backoff(config), action, condition)
        .await
        .map_err(|e| {
            if e.is_retryable() {
                EngineError::Transient(format!("{operation} kept conflicting: {e}"))
            } else {
                e
            }
        })
}
