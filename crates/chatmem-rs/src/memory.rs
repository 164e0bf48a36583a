//! Per-turn driver over a window store and a long-term coordinator.
//!
//! [`ShortTermMemory`] is what a host calls once per conversational turn.
//! Each call runs the full cycle under the session's lock:
//!
//! ```text
//! load ─► append ─► slide ─► promote ─► remove (if promoted) ─► save
//! ```
//!
//! Pending entries are only removed after the backend confirms the add. If
//! the future is dropped before `save`, the stored window is unchanged and
//! the same entries are submitted again on a later turn, so promotion is
//! at-least-once.

use crate::Message;
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::longterm::{HttpLongTermBackend, LongTermMemory, PromotionOutcome};
use crate::session::SessionLocks;
use crate::store::{FileWindowStore, WindowStore};
use crate::window::{
    DEFAULT_CAPACITY, Window, entries_to_context_messages, remove_promoted,
    slide_and_collect_pending,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// What one [`ShortTermMemory::process_turn`] call did.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    pub session_id: String,
    /// Sequence number given to the appended turn.
    pub seq: u64,
    pub active_count: usize,
    /// Entries still waiting for promotion after this turn.
    pub pending_count: usize,
    pub promotion: PromotionOutcome,
}

/// Short-term memory for many sessions sharing one store and backend.
#[derive(Clone)]
pub struct ShortTermMemory {
    store: Arc<dyn WindowStore>,
    long_term: LongTermMemory,
    locks: Arc<SessionLocks>,
    capacity: usize,
}

impl std::fmt::Debug for ShortTermMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortTermMemory")
            .field("long_term", &self.long_term)
            .field("capacity", &self.capacity)
            .field("sessions", &self.locks.len())
            .finish()
    }
}

impl ShortTermMemory {
    pub fn new(store: Arc<dyn WindowStore>, long_term: LongTermMemory) -> Self {
        Self {
            store,
            long_term,
            locks: Arc::new(SessionLocks::new()),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// File-backed memory with the HTTP backend when `long_term` is
    /// configured, or the configured disabled policy otherwise.
    pub fn from_config(config: &MemoryConfig) -> Result<Self> {
        let store = Arc::new(FileWindowStore::new(config.windows_dir()));
        let long_term = match &config.long_term {
            Some(settings) => LongTermMemory::new(Arc::new(HttpLongTermBackend::new(settings)?)),
            None => LongTermMemory::disabled(config.disabled_policy),
        }
        .with_timeout(config.backend_timeout());
        Ok(Self::new(store, long_term).with_capacity(config.capacity))
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Share a lock registry with another component that touches the same
    /// store.
    pub fn with_locks(mut self, locks: Arc<SessionLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn long_term(&self) -> &LongTermMemory {
        &self.long_term
    }

    pub fn locks(&self) -> &Arc<SessionLocks> {
        &self.locks
    }

    /// Record one exchange and promote whatever overflowed the window.
    pub async fn process_turn(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
    ) -> Result<TurnReport> {
        self.process_turn_with_capacity(session_id, user, assistant, self.capacity)
            .await
    }

    /// [`process_turn`](Self::process_turn) with an explicit capacity.
    ///
    /// Only a failed save is an error. Backend failures leave entries
    /// pending and show up in [`TurnReport::promotion`].
    pub async fn process_turn_with_capacity(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
        capacity: usize,
    ) -> Result<TurnReport> {
        let _guard = self.locks.acquire(session_id).await;

        let mut window = self.store.load(session_id).await;
        let seq = window.append_turn(user, assistant);

        let batch = slide_and_collect_pending(&mut window, capacity);
        let promotion = self.long_term.promote(session_id, &batch).await;
        if promotion.should_remove() {
            let removed = remove_promoted(&mut window, &batch);
            debug!("Removed {removed} promoted entries from session {session_id}");
        }

        self.store.save(&window).await?;

        Ok(TurnReport {
            session_id: session_id.to_string(),
            seq,
            active_count: window.active_count(),
            pending_count: window.pending_count(),
            promotion,
        })
    }

    /// All stored entries (active and pending) as user/assistant message
    /// pairs, oldest first.
    pub async fn get_context_messages(&self, session_id: &str) -> Vec<Message> {
        let window = self.load_window(session_id).await;
        entries_to_context_messages(&window.entries)
    }

    /// Snapshot of the stored window, read under the session lock.
    pub async fn load_window(&self, session_id: &str) -> Window {
        let _guard = self.locks.acquire(session_id).await;
        self.store.load(session_id).await
    }

    /// Long-term memories relevant to `query`. Empty when disabled or on
    /// backend failure.
    pub async fn recall(&self, session_id: &str, query: &str, limit: usize) -> Vec<String> {
        self.long_term.search(session_id, query, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use crate::error::MemoryError;
    use crate::longterm::DisabledPolicy;
    use crate::longterm::testing::ScriptedBackend;
    use crate::store::{InMemoryWindowStore, StoreFuture};
    use std::sync::atomic::Ordering;

    fn memory_with(backend: Arc<ScriptedBackend>, capacity: usize) -> ShortTermMemory {
        ShortTermMemory::new(
            Arc::new(InMemoryWindowStore::new()),
            LongTermMemory::new(backend),
        )
        .with_capacity(capacity)
    }

    fn users(window: &Window, pending: bool) -> Vec<String> {
        window
            .entries
            .iter()
            .filter(|e| e.is_pending() == pending)
            .map(|e| e.user.clone())
            .collect()
    }

    #[tokio::test]
    async fn turns_below_capacity_do_not_promote() {
        let backend = Arc::new(ScriptedBackend::default());
        let memory = memory_with(backend.clone(), 3);

        for t in ["t1", "t2", "t3"] {
            let report = memory.process_turn("s", t, "ok").await.unwrap();
            assert_eq!(report.promotion, PromotionOutcome::Empty);
        }

        assert_eq!(backend.add_calls.load(Ordering::SeqCst), 0);
        assert_eq!(memory.load_window("s").await.active_count(), 3);
    }

    #[tokio::test]
    async fn overflow_is_promoted_and_removed() {
        let backend = Arc::new(ScriptedBackend::default());
        let memory = memory_with(backend.clone(), 2);

        memory.process_turn("s", "t1", "a1").await.unwrap();
        memory.process_turn("s", "t2", "a2").await.unwrap();
        let report = memory.process_turn("s", "t3", "a3").await.unwrap();

        assert_eq!(report.seq, 3);
        assert_eq!(report.promotion, PromotionOutcome::Promoted(1));
        assert_eq!(report.active_count, 2);
        assert_eq!(report.pending_count, 0);
        assert_eq!(backend.added_users(), vec!["t1"]);

        let window = memory.load_window("s").await;
        assert_eq!(users(&window, false), vec!["t2", "t3"]);
    }

    #[tokio::test]
    async fn failed_promotion_is_retried_with_the_next_overflow() {
        let backend = Arc::new(ScriptedBackend::failing());
        let memory = memory_with(backend.clone(), 2);

        for t in ["t1", "t2", "t3"] {
            memory.process_turn("s", t, "ok").await.unwrap();
        }
        let window = memory.load_window("s").await;
        assert_eq!(users(&window, true), vec!["t1"]);
        assert_eq!(users(&window, false), vec!["t2", "t3"]);

        backend.fail_adds.store(false, Ordering::SeqCst);
        let report = memory.process_turn("s", "t4", "ok").await.unwrap();

        assert_eq!(report.promotion, PromotionOutcome::Promoted(2));
        assert_eq!(report.pending_count, 0);
        assert_eq!(backend.added_users(), vec!["t1", "t2"]);
        let window = memory.load_window("s").await;
        assert_eq!(users(&window, false), vec!["t3", "t4"]);
    }

    #[tokio::test]
    async fn failure_keeps_pending_count_in_report() {
        let memory = memory_with(Arc::new(ScriptedBackend::failing()), 1);

        memory.process_turn("s", "t1", "ok").await.unwrap();
        let report = memory.process_turn("s", "t2", "ok").await.unwrap();

        assert_eq!(report.promotion, PromotionOutcome::Failed);
        assert_eq!(report.pending_count, 1);
        assert_eq!(report.active_count, 1);
    }

    #[tokio::test]
    async fn unknown_session_loads_empty() {
        let memory = memory_with(Arc::new(ScriptedBackend::default()), 2);
        assert!(memory.load_window("never-seen").await.is_empty());
        assert!(memory.get_context_messages("never-seen").await.is_empty());
    }

    #[tokio::test]
    async fn disabled_discard_drops_overflow() {
        let memory = ShortTermMemory::new(
            Arc::new(InMemoryWindowStore::new()),
            LongTermMemory::disabled(DisabledPolicy::Discard),
        )
        .with_capacity(1);

        memory.process_turn("s", "t1", "ok").await.unwrap();
        let report = memory.process_turn("s", "t2", "ok").await.unwrap();

        assert_eq!(report.promotion, PromotionOutcome::Discarded(1));
        assert_eq!(users(&memory.load_window("s").await, false), vec!["t2"]);
        assert_eq!(memory.load_window("s").await.len(), 1);
    }

    #[tokio::test]
    async fn disabled_retain_keeps_overflow_pending() {
        let memory = ShortTermMemory::new(
            Arc::new(InMemoryWindowStore::new()),
            LongTermMemory::disabled(DisabledPolicy::Retain),
        )
        .with_capacity(1);

        for t in ["t1", "t2", "t3"] {
            memory.process_turn("s", t, "ok").await.unwrap();
        }

        let window = memory.load_window("s").await;
        assert_eq!(users(&window, true), vec!["t1", "t2"]);
        assert_eq!(users(&window, false), vec!["t3"]);
    }

    #[tokio::test]
    async fn explicit_capacity_overrides_default() {
        let backend = Arc::new(ScriptedBackend::default());
        let memory = memory_with(backend.clone(), 30);

        memory.process_turn_with_capacity("s", "t1", "ok", 1).await.unwrap();
        let report = memory
            .process_turn_with_capacity("s", "t2", "ok", 1)
            .await
            .unwrap();

        assert_eq!(report.promotion, PromotionOutcome::Promoted(1));
        assert_eq!(backend.added_users(), vec!["t1"]);
    }

    #[tokio::test]
    async fn context_includes_pending_entries_in_order() {
        let memory = ShortTermMemory::new(
            Arc::new(InMemoryWindowStore::new()),
            LongTermMemory::disabled(DisabledPolicy::Retain),
        )
        .with_capacity(1);
        memory.process_turn("s", "q1", "a1").await.unwrap();
        memory.process_turn("s", "q2", "a2").await.unwrap();

        let messages = memory.get_context_messages("s").await;

        let texts: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn recall_goes_through_backend() {
        let backend = Arc::new(ScriptedBackend {
            memories: vec!["likes tea".into()],
            ..Default::default()
        });
        let memory = memory_with(backend, 2);
        assert_eq!(memory.recall("s", "drinks", 5).await, vec!["likes tea"]);
    }

    /// In-memory store that yields inside load and save so unsynchronized
    /// turns would interleave.
    #[derive(Default)]
    struct YieldingStore(InMemoryWindowStore);

    impl WindowStore for YieldingStore {
        fn load<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Window> {
            Box::pin(async move {
                tokio::task::yield_now().await;
                self.0.load(session_id).await
            })
        }

        fn save<'a>(&'a self, window: &'a Window) -> StoreFuture<'a, Result<()>> {
            Box::pin(async move {
                tokio::task::yield_now().await;
                self.0.save(window).await
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_for_one_session_are_not_lost() {
        let memory = Arc::new(
            ShortTermMemory::new(
                Arc::new(YieldingStore::default()),
                LongTermMemory::disabled(DisabledPolicy::Retain),
            )
            .with_capacity(100),
        );

        let handles: Vec<_> = (0..25)
            .map(|i| {
                let memory = memory.clone();
                tokio::spawn(async move {
                    memory
                        .process_turn("shared", &format!("t{i}"), "ok")
                        .await
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        let window = memory.load_window("shared").await;
        assert_eq!(window.len(), 25);
        let seqs: Vec<_> = window.entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=25).collect::<Vec<u64>>());
    }

    struct ReadOnlyStore;

    impl WindowStore for ReadOnlyStore {
        fn load<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Window> {
            Box::pin(async move { Window::new(session_id) })
        }

        fn save<'a>(&'a self, _window: &'a Window) -> StoreFuture<'a, Result<()>> {
            Box::pin(async move {
                Err(MemoryError::io(
                    "/read-only/s.json",
                    std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                ))
            })
        }
    }

    #[tokio::test]
    async fn save_failure_propagates() {
        let memory = ShortTermMemory::new(Arc::new(ReadOnlyStore), LongTermMemory::default());
        let result = memory.process_turn("s", "hi", "hello").await;
        assert!(matches!(result, Err(MemoryError::Io { .. })));
    }

    #[test]
    fn from_config_uses_file_store_and_disabled_policy() {
        let config = MemoryConfig::default()
            .with_capacity(7)
            .with_disabled_policy(DisabledPolicy::Retain);

        let memory = ShortTermMemory::from_config(&config).unwrap();

        assert_eq!(memory.capacity(), 7);
        assert!(!memory.long_term().is_enabled());
        assert_eq!(memory.long_term().disabled_policy(), DisabledPolicy::Retain);
    }
}
