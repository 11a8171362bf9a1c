//! In-process session memory.
//!
//! ```text
//! scc::HashMap<session_id, Arc<Mutex<SessionRecord>>>
//!        │                         │
//!        │ lock-free per bucket    └── held only to copy or append turns,
//!        │ (ids never contend)         never across a model call
//! ```

use crate::types::{SessionRecord, Turn};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

type SessionHandle = Arc<Mutex<SessionRecord>>;

/// Transcripts for every live session.
///
/// Unknown ids are not errors: the first reference creates an empty record.
/// Records are only removed through [`evict`](Self::evict).
#[derive(Default)]
pub struct SessionStore {
    sessions: scc::HashMap<String, SessionHandle>,
    /// Oldest whole exchanges are dropped once a record exceeds this many turns.
    max_turns_per_session: Option<usize>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap stored turns per session. Values below 2 are raised to 2 so the
    /// latest exchange always survives.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns_per_session = Some(max_turns.max(2));
        self
    }

    fn handle(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read(session_id, |_, v| Arc::clone(v)) {
            return handle;
        }

        let fresh = Arc::new(Mutex::new(SessionRecord::new(session_id)));
        match self
            .sessions
            .insert(session_id.to_string(), Arc::clone(&fresh))
        {
            Ok(()) => {
                debug!(session_id, "Created session");
                fresh
            }
            // Another task created it between our read and insert.
            Err(_) => self
                .sessions
                .read(session_id, |_, v| Arc::clone(v))
                .unwrap_or(fresh),
        }
    }

    /// Snapshot of the session's record, creating an empty one if needed.
    pub async fn get_or_create(&self, session_id: &str) -> SessionRecord {
        self.handle(session_id).lock().await.clone()
    }

    /// Snapshot of the session's turns, oldest first.
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.handle(session_id).lock().await.turns.clone()
    }

    /// Append one turn at the end of the session.
    pub async fn append(&self, session_id: &str, turn: Turn) {
        let handle = self.handle(session_id);
        let mut record = handle.lock().await;
        record.turns.push(turn);
        self.enforce_retention(&mut record);
    }

    /// Append a user turn and its reply under one lock acquisition, so
    /// concurrent writers never interleave inside the pair.
    #[instrument(skip(self, user, assistant))]
    pub async fn append_exchange(&self, session_id: &str, user: Turn, assistant: Turn) {
        let handle = self.handle(session_id);
        let mut record = handle.lock().await;
        record.turns.push(user);
        record.turns.push(assistant);
        self.enforce_retention(&mut record);
        debug!(turns = record.turns.len(), "Exchange persisted");
    }

    /// Remove a session, returning its final record.
    ///
    /// Eviction does not wait for invocations already running on the id. One
    /// that finishes afterwards persists its exchange into a fresh record
    /// holding only that exchange.
    pub async fn evict(&self, session_id: &str) -> Option<SessionRecord> {
        let (_, handle) = self.sessions.remove(session_id)?;
        let record = handle.lock().await.clone();
        debug!(session_id, turns = record.turns.len(), "Evicted session");
        Some(record)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All session ids, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.sessions.len());
        self.sessions.scan(|k, _| ids.push(k.clone()));
        ids.sort();
        ids
    }

    fn enforce_retention(&self, record: &mut SessionRecord) {
        let Some(max) = self.max_turns_per_session else {
            return;
        };
        if record.turns.len() <= max {
            return;
        }
        // Round up to an even count so pairs stay intact.
        let excess = record.turns.len() - max;
        let drop = (excess + excess % 2).min(record.turns.len());
        record.turns.drain(..drop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_session_is_created_empty() {
        let store = SessionStore::new();
        let record = store.get_or_create("s1").await;
        assert_eq!(record.session_id, "s1");
        assert!(record.turns.is_empty());
        assert!(store.contains("s1"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = SessionStore::new();
        store.append("s1", Turn::user("one")).await;
        store.append("s1", Turn::assistant("two")).await;
        store
            .append_exchange("s1", Turn::user("three"), Turn::assistant("four"))
            .await;

        let texts: Vec<String> = store
            .history("s1")
            .await
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three", "four"]);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let store = SessionStore::new();
        let before = store.history("s1").await;
        store
            .append_exchange("s1", Turn::user("hi"), Turn::assistant("hello"))
            .await;
        assert!(before.is_empty());
        assert_eq!(store.history("s1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_evict() {
        let store = SessionStore::new();
        store.append("s1", Turn::user("hi")).await;

        let record = store.evict("s1").await.unwrap();
        assert_eq!(record.turns.len(), 1);
        assert!(!store.contains("s1"));
        assert!(store.evict("s1").await.is_none());
        assert!(store.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_after_evict_starts_fresh_record() {
        let store = SessionStore::new();
        store
            .append_exchange("s1", Turn::user("one"), Turn::assistant("1"))
            .await;

        // An invocation read its history, then the session was evicted.
        let snapshot = store.history("s1").await;
        let evicted = store.evict("s1").await.unwrap();
        assert_eq!(evicted.turns, snapshot);

        store
            .append_exchange("s1", Turn::user("two"), Turn::assistant("2"))
            .await;
        assert_eq!(
            store.history("s1").await,
            vec![Turn::user("two"), Turn::assistant("2")]
        );
    }

    #[tokio::test]
    async fn test_retention_drops_whole_exchanges() {
        let store = SessionStore::new().with_max_turns(4);
        for i in 0..3 {
            store
                .append_exchange("s1", Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}")))
                .await;
        }

        let history = store.history("s1").await;
        let texts: Vec<&str> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q1", "a1", "q2", "a2"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exchanges_never_interleave() {
        let store = Arc::new(SessionStore::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .append_exchange("shared", Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}")))
                    .await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let history = store.history("shared").await;
        assert_eq!(history.len(), 64);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].text[1..], pair[1].text[1..]);
            assert_eq!(pair[0].role, crate::types::Role::User);
        }
    }

    #[tokio::test]
    async fn test_session_ids_sorted() {
        let store = SessionStore::new();
        store.get_or_create("b").await;
        store.get_or_create("a").await;
        assert_eq!(store.session_ids(), vec!["a", "b"]);
    }
}
