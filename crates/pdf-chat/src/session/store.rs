//! Per-session state: conversation history, knowledge base handle, notice

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::error::Result;
use crate::knowledge_base::{KnowledgeBase, KnowledgeBaseFactory};
use crate::types::ConversationEntry;

/// Message shown once at the top of the page after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(msg) | Self::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// State owned by one UI session
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    history: RwLock<Vec<ConversationEntry>>,
    knowledge_base: OnceCell<Arc<KnowledgeBase>>,
    factory: Arc<dyn KnowledgeBaseFactory>,
    notice: Mutex<Option<Notice>>,
    /// Serialises upload, submit and clear
    actions: tokio::sync::Mutex<()>,
    last_seen: Mutex<Instant>,
}

impl Session {
    pub fn new(id: Uuid, factory: Arc<dyn KnowledgeBaseFactory>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            history: RwLock::new(Vec::new()),
            knowledge_base: OnceCell::new(),
            factory,
            notice: Mutex::new(None),
            actions: tokio::sync::Mutex::new(()),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of the conversation in display order
    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.history.read().clone()
    }

    pub fn append(&self, entry: ConversationEntry) {
        self.history.write().push(entry);
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.history.write().clear();
    }

    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The session's knowledge base, created on first use.
    ///
    /// Concurrent first calls share one creation; a failed creation is retried
    /// on the next call.
    pub async fn knowledge_base(&self) -> Result<Arc<KnowledgeBase>> {
        let kb = self
            .knowledge_base
            .get_or_try_init(|| async {
                tracing::debug!("Creating knowledge base for session {}", self.id);
                self.factory.create().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(kb))
    }

    /// The knowledge base if it has been created
    pub fn existing_knowledge_base(&self) -> Option<Arc<KnowledgeBase>> {
        self.knowledge_base.get().cloned()
    }

    pub fn set_notice(&self, notice: Notice) {
        *self.notice.lock() = Some(notice);
    }

    /// Take the pending notice so it is shown only once
    pub fn take_notice(&self) -> Option<Notice> {
        self.notice.lock().take()
    }

    /// Wait for exclusive use of the session for one action
    pub async fn begin_action(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.actions.lock().await
    }

    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}
