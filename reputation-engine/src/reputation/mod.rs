//! Append-only reputation ledger.
//!
//! A user's `reputation` is a cache over their `ReputationChange` entries.
//! Both move together inside one storage transaction, so the sum of the
//! ledger always equals the cached total.
use std::sync::Arc;

use reputation_repository::LedgerStore;
use reputation_shared::types::{NewReputationChange, ReputationChange, ReputationChangeKind, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::EngineError;

/// Cached reputation of a user compared against the sum of their ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationAudit {
    pub user_id: UserId,
    pub cached: i32,
    pub ledger_total: i64,
    pub consistent: bool,
}

/// An audit together with the ledger entries it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationStatement {
    #[serde(flatten)]
    pub audit: ReputationAudit,
    pub history: Vec<ReputationChange>,
}

#[derive(Clone)]
pub struct ReputationLedger {
    store: Arc<dyn LedgerStore>,
}

impl ReputationLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Records a reputation change for `user_id` and adjusts their total.
    ///
    /// # Errors
    ///
    /// [`EngineError::UserNotFound`] if the user does not exist, in which case
    /// nothing is written.
    pub async fn apply_change(
        &self,
        user_id: UserId,
        kind: ReputationChangeKind,
        delta: i32,
        description: impl Into<String>,
    ) -> Result<ReputationChange, EngineError> {
        self.apply(&NewReputationChange {
            user_id,
            kind,
            delta,
            description: description.into(),
        })
        .await
    }

    /// Same as [`apply_change`](Self::apply_change) for a prepared change.
    #[instrument(skip(self, change), fields(user_id = change.user_id, kind = %change.kind, delta = change.delta))]
    pub async fn apply(&self, change: &NewReputationChange) -> Result<ReputationChange, EngineError> {
        let mut tx = self.store.begin().await?;

        // The increment doubles as the existence check and takes the user's
        // row lock before the ledger entry is written.
        let Some(user) = tx.increment_reputation(change.user_id, change.delta).await? else {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback of reputation change failed");
            }
            return Err(EngineError::UserNotFound(change.user_id));
        };
        let recorded = tx.append_reputation_change(change).await?;
        tx.commit().await?;

        debug!(reputation = user.reputation, "Reputation change applied");
        Ok(recorded)
    }

    /// Every change recorded for a user, oldest first.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<ReputationChange>, EngineError> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(EngineError::UserNotFound(user_id));
        }
        Ok(self.store.reputation_history(user_id).await?)
    }

    /// Rebuilds a user's reputation from the ledger and compares it with the
    /// cached total.
    pub async fn audit(&self, user_id: UserId) -> Result<ReputationAudit, EngineError> {
        Ok(self.statement(user_id).await?.audit)
    }

    /// Reads a user's ledger once and returns it with the audit computed from
    /// exactly those entries.
    pub async fn statement(&self, user_id: UserId) -> Result<ReputationStatement, EngineError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(EngineError::UserNotFound(user_id))?;
        let history = self.store.reputation_history(user_id).await?;
        let ledger_total: i64 = history.iter().map(|change| i64::from(change.delta)).sum();

        Ok(ReputationStatement {
            audit: ReputationAudit {
                user_id,
                cached: user.reputation,
                ledger_total,
                consistent: i64::from(user.reputation) == ledger_total,
            },
            history,
        })
    }
}
