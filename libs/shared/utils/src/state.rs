use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::{ChangeFeed, DocumentStore};

/// Shared by every cell router: configuration, the document store and the change feed.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub feed: ChangeFeed,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = shared_database::connect(&config);
        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            feed: ChangeFeed::new(),
        }
    }
}
