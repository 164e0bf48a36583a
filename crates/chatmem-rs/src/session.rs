//! Per-session mutual exclusion for window read-modify-write cycles.
//!
//! Two turns for the same session must not interleave their load and save,
//! or one turn's append is overwritten by the other's save. Turns for
//! different sessions never wait on each other.
//!
//! [`SessionLocks`] hands out one async mutex per session ID. Locks are
//! created lazily and kept for the registry's lifetime; the set of sessions
//! is bounded by the host's active conversations. The map itself sits behind
//! a short-held `std::sync::Mutex` that is never held across an `.await`, so
//! two first turns of a brand-new session agree on a single lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-session async locks.
///
/// Construct one per memory instance and share it by `Arc` with every
/// turn handler.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Guard proving the holder owns a session's window until dropped.
pub type SessionGuard = OwnedMutexGuard<()>;

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `session_id`, created on first use.
    pub fn lock_for(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        self.lock_for(session_id).lock_owned().await
    }

    /// Number of sessions that have a lock.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn same_session_shares_one_lock() {
        let locks = SessionLocks::new();
        let a = locks.lock_for("s1");
        let b = locks.lock_for("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn different_sessions_get_different_locks() {
        let locks = SessionLocks::new();
        let a = locks.lock_for("s1");
        let b = locks.lock_for("s2");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn held_session_blocks_same_session_only() {
        let locks = SessionLocks::new();
        let _held = locks.acquire("s1").await;

        let other = tokio::time::timeout(Duration::from_millis(100), locks.acquire("s2")).await;
        assert!(other.is_ok(), "other sessions must not wait");

        let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire("s1")).await;
        assert!(same.is_err(), "same session must wait for the holder");
    }

    #[tokio::test]
    async fn lock_is_released_on_drop() {
        let locks = SessionLocks::new();
        drop(locks.acquire("s1").await);
        let again = tokio::time::timeout(Duration::from_millis(100), locks.acquire("s1")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn concurrent_first_use_creates_one_lock() {
        let locks = Arc::new(SessionLocks::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let locks = locks.clone();
                tokio::spawn(async move { locks.lock_for("fresh") })
            })
            .collect();

        let mut created = Vec::new();
        for h in handles {
            created.push(h.await.unwrap());
        }
        assert!(created.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(locks.len(), 1);
    }
}
