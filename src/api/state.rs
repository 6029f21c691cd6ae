use std::sync::Arc;

use crate::application::ChunkedVectorStore;
use crate::infrastructure::{AppConfig, IndexRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<IndexRegistry>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(registry: IndexRegistry, config: AppConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    pub fn store(&self, index: &str) -> Option<Arc<ChunkedVectorStore>> {
        self.registry.get(index).ok()
    }
}
