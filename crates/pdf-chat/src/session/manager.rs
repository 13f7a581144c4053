//! Session registry keyed by the session cookie

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::knowledge_base::KnowledgeBaseFactory;

use super::store::Session;

/// Maps session ids to live sessions and expires idle ones
pub struct SessionManager {
    sessions: DashMap<Uuid, Arc<Session>>,
    factory: Arc<dyn KnowledgeBaseFactory>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn KnowledgeBaseFactory>, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            factory,
            ttl,
        }
    }

    /// Look up the session for `id`, creating a new one when the id is missing
    /// or unknown. The flag is true when a session was created.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Arc<Session>, bool) {
        if let Some(session) = id.and_then(|id| self.get(&id)) {
            session.touch();
            return (session, false);
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(id, Arc::clone(&self.factory)));
        self.sessions.insert(id, Arc::clone(&session));
        tracing::info!("Started session {}", id);
        (session, true)
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop sessions idle longer than the TTL, returning how many were dropped
    pub fn evict_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, session| {
            let keep = session.idle_for() < self.ttl;
            if !keep {
                tracing::info!("Session {} expired after {:?} idle", id, session.idle_for());
            }
            keep
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeFactory;

    fn manager(ttl: Duration) -> SessionManager {
        SessionManager::new(Arc::new(FakeFactory::answering("a")), ttl)
    }

    #[test]
    fn test_unknown_id_creates_session() {
        let m = manager(Duration::from_secs(60));
        let (first, created) = m.get_or_create(None);
        assert!(created);

        let (same, created) = m.get_or_create(Some(first.id()));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &same));

        let (other, created) = m.get_or_create(Some(Uuid::new_v4()));
        assert!(created);
        assert_ne!(other.id(), first.id());
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_sessions_do_not_share_history() {
        let m = manager(Duration::from_secs(60));
        let (a, _) = m.get_or_create(None);
        let (b, _) = m.get_or_create(None);

        a.append(crate::types::ConversationEntry::user("only in a"));
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_evict_idle() {
        let m = manager(Duration::ZERO);
        m.get_or_create(None);
        m.get_or_create(None);
        assert_eq!(m.evict_idle(), 2);
        assert!(m.is_empty());

        let m = manager(Duration::from_secs(3600));
        m.get_or_create(None);
        assert_eq!(m.evict_idle(), 0);
        assert_eq!(m.len(), 1);
    }
}
