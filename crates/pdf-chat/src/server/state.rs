//! Application state for the chat server

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::knowledge_base::{ConfigFactory, KnowledgeBaseFactory};
use crate::session::SessionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Live UI sessions
    sessions: SessionManager,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state whose sessions build knowledge bases from the configuration
    pub fn new(config: AppConfig) -> Self {
        let factory = Arc::new(ConfigFactory::new(
            config.knowledge_base.clone(),
            config.chunking.clone(),
        ));
        Self::with_factory(config, factory)
    }

    /// Create state with a custom knowledge base factory
    pub fn with_factory(config: AppConfig, factory: Arc<dyn KnowledgeBaseFactory>) -> Self {
        let ttl = Duration::from_secs(config.session.ttl_secs);
        Self {
            inner: Arc::new(AppStateInner {
                sessions: SessionManager::new(factory, ttl),
                config,
                ready: RwLock::new(false),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
