use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use cosproxy_pool::AccountPool;
use cosproxy_upstream::ChatUpstream;

use crate::catalog::{health, list_models};
use crate::chat::chat_completions;

pub struct CoreState {
    pub pool: AccountPool,
    pub upstream: Arc<dyn ChatUpstream>,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(pool: AccountPool, upstream: Arc<dyn ChatUpstream>) -> Self {
        Self {
            state: Arc::new(CoreState { pool, upstream }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/v1/models", get(list_models))
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
