use agent_core::config::AppConfig;
use agent_core::scanner::SessionStore;
use std::sync::Arc;

/// Shared application state for the server.
///
/// Holds no session data: every request reads the log directory afresh.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = SessionStore::from_config(&config.logs);
        Self {
            config,
            store: Arc::new(store),
        }
    }
}
