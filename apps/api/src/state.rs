use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::ModelApi;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The model boundary. `GeminiClient` in production, scripted in tests.
    pub model: Arc<dyn ModelApi>,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
    /// Backoff policy for quota failures on one-shot model calls.
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(model: Arc<dyn ModelApi>, config: Config) -> Self {
        Self {
            model,
            sessions: Arc::new(SessionStore::new(
                config.quota_cooldown,
                config.session_idle_ttl,
            )),
            retry: RetryPolicy::with_max_attempts(config.llm_max_attempts),
            config,
        }
    }
}
