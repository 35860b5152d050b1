//! In-process session store.

use super::{SessionMemory, SessionStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

/// Session store backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionMemory>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers of all sessions, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session_id: &str) -> Option<SessionMemory> {
        self.sessions.read().get(session_id).cloned()
    }

    fn put(&self, session_id: &str, memory: SessionMemory) {
        self.sessions.write().insert(session_id.to_string(), memory);
    }

    fn get_or_create(&self, session_id: &str) -> SessionMemory {
        if let Some(memory) = self.get(session_id) {
            return memory;
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!("Created new session memory for session_id={}", session_id);
                SessionMemory::new()
            })
            .clone()
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.len(), 0);

        let first = store.get_or_create("a");
        let second = store.get_or_create("a");

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_does_not_create() {
        let store = InMemorySessionStore::new();
        assert!(store.get("missing").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        let mut a = store.get_or_create("a");
        a.last_summary = Some("report a".to_string());
        store.put("a", a);

        let b = store.get_or_create("b");

        assert_eq!(b.last_summary, None);
        assert_eq!(
            store.get("a").and_then(|m| m.last_summary),
            Some("report a".to_string())
        );
        assert_eq!(store.session_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_put_is_last_writer_wins() {
        let store = InMemorySessionStore::new();
        let mut memory = store.get_or_create("s");
        memory.last_year = Some(2023);
        store.put("s", memory.clone());
        memory.last_year = Some(2024);
        store.put("s", memory);

        assert_eq!(store.get("s").and_then(|m| m.last_year), Some(2024));
    }
}
