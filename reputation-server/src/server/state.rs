use std::sync::Arc;

use reputation_engine::VoteCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<VoteCoordinator>,
}
