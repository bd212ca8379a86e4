//! Bounded conversation history.
//!
//! [`History`] is a FIFO of alternating prompts and replies that drops its
//! oldest entry once full. [`HistoryStore`] owns the shared history used by
//! requests without a session id plus a bounded set of per-session histories.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A history shared between handlers.
pub type SharedHistory = Arc<Mutex<History>>;

/// Fixed-capacity ordered buffer of past prompts and replies.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the end, evicting from the front while over capacity.
    pub fn append(&mut self, entry: impl Into<String>) {
        self.entries.push_back(entry.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Append a prompt followed by its reply.
    pub fn append_exchange(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.append(prompt);
        self.append(reply);
    }

    /// Entries in insertion order.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Entries joined with newlines, as fed to the model.
    pub fn joined(&self) -> String {
        self.entries
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Owner of every conversation history in the process.
pub struct HistoryStore {
    global: SharedHistory,
    sessions: Mutex<SessionHistories>,
    capacity: usize,
    max_sessions: usize,
}

#[derive(Default)]
struct SessionHistories {
    by_id: HashMap<String, SharedHistory>,
    /// Session ids, oldest first.
    created: VecDeque<String>,
}

impl HistoryStore {
    pub fn new(capacity: usize, max_sessions: usize) -> Self {
        Self {
            global: Arc::new(Mutex::new(History::new(capacity))),
            sessions: Mutex::new(SessionHistories::default()),
            capacity,
            max_sessions,
        }
    }

    /// The history a request should use: the session's own when an id is
    /// given, the shared one otherwise.
    pub async fn resolve(&self, session_id: Option<&str>) -> SharedHistory {
        let Some(id) = session_id else {
            return Arc::clone(&self.global);
        };

        let mut sessions = self.sessions.lock().await;
        if let Some(history) = sessions.by_id.get(id) {
            return Arc::clone(history);
        }

        while sessions.by_id.len() >= self.max_sessions {
            let Some(oldest) = sessions.created.pop_front() else {
                break;
            };
            sessions.by_id.remove(&oldest);
            tracing::debug!(session = %oldest, "evicted session history");
        }

        let history = Arc::new(Mutex::new(History::new(self.capacity)));
        sessions.by_id.insert(id.to_string(), Arc::clone(&history));
        sessions.created.push_back(id.to_string());
        history
    }

    /// The history used by requests without a session id.
    pub fn global(&self) -> SharedHistory {
        Arc::clone(&self.global)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.by_id.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_within_capacity() {
        let mut history = History::new(4);
        history.append_exchange("a", "A");
        assert_eq!(history.len(), 2);
        assert_eq!(history.snapshot(), vec!["a", "A"]);
        assert_eq!(history.joined(), "a\nA");
    }

    #[test]
    fn oldest_pair_is_evicted() {
        let mut history = History::new(4);
        for (prompt, reply) in [("a", "A"), ("b", "B"), ("c", "C")] {
            history.append_exchange(prompt, reply);
        }
        assert_eq!(history.snapshot(), vec!["b", "B", "c", "C"]);
    }

    #[test]
    fn odd_capacity_evicts_single_entries() {
        let mut history = History::new(3);
        history.append_exchange("a", "A");
        history.append_exchange("b", "B");
        assert_eq!(history.snapshot(), vec!["A", "b", "B"]);
        assert!(history.len() <= history.capacity());
    }

    #[test]
    fn empty_history_joins_to_empty_string() {
        let history = History::new(20);
        assert!(history.is_empty());
        assert_eq!(history.joined(), "");
    }

    #[tokio::test]
    async fn no_session_resolves_to_global() {
        let store = HistoryStore::new(4, 2);
        store.resolve(None).await.lock().await.append("x");
        assert_eq!(store.global().lock().await.len(), 1);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = HistoryStore::new(4, 8);
        store.resolve(Some("alice")).await.lock().await.append("hi");
        let bob = store.resolve(Some("bob")).await;
        assert!(bob.lock().await.is_empty());
        let alice = store.resolve(Some("alice")).await;
        assert_eq!(alice.lock().await.snapshot(), vec!["hi"]);
        assert!(store.global().lock().await.is_empty());
    }

    #[tokio::test]
    async fn oldest_session_is_evicted() {
        let store = HistoryStore::new(4, 2);
        store.resolve(Some("s1")).await.lock().await.append("one");
        store.resolve(Some("s2")).await;
        store.resolve(Some("s3")).await;
        assert_eq!(store.session_count().await, 2);
        // s1 was dropped, so it comes back empty.
        assert!(store.resolve(Some("s1")).await.lock().await.is_empty());
    }
}
