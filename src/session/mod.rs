//! Per-session memory.
//!
//! A session remembers the latest artifact produced by each pipeline stage
//! so that later calls can reuse it. Sessions are created lazily on first
//! access and live for the lifetime of the store.

mod store;

pub use store::InMemorySessionStore;

use crate::models::{AggregatedRow, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session identifier used when the caller does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Returned by report retrieval when nothing has been rendered yet.
pub const NO_PREVIOUS_SUMMARY_TEXT: &str =
    "I don't have a previous summary stored yet in this session.";

/// The most recent value produced at each stage for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMemory {
    pub last_year: Option<i32>,
    pub last_raw_records: Option<Vec<Record>>,
    pub last_aggregated: Option<Vec<AggregatedRow>>,
    pub last_compacted: Option<Vec<AggregatedRow>>,
    /// Full text of the last rendered report.
    pub last_summary: Option<String>,
    pub last_search_query: Option<String>,
    pub last_search_results: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionMemory {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            last_year: None,
            last_raw_records: None,
            last_aggregated: None,
            last_compacted: None,
            last_summary: None,
            last_search_query: None,
            last_search_results: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Key-value storage for session memory.
///
/// Implementations only store and return values; serializing writers to
/// the same session is the caller's job.
pub trait SessionStore: Send + Sync {
    /// Load a session's memory, if it exists.
    fn get(&self, session_id: &str) -> Option<SessionMemory>;

    /// Replace a session's memory.
    fn put(&self, session_id: &str, memory: SessionMemory);

    /// Load a session's memory, creating an empty one on first access.
    fn get_or_create(&self, session_id: &str) -> SessionMemory {
        if let Some(memory) = self.get(session_id) {
            return memory;
        }

        let memory = SessionMemory::new();
        self.put(session_id, memory.clone());
        tracing::info!("Created new session memory for session_id={}", session_id);
        memory
    }

    /// Number of sessions held.
    fn len(&self) -> usize;
}
