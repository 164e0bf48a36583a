//! Long-term memory: the backend contract and the promotion coordinator.
//!
//! The crate never stores long-term memories itself. It talks to a backend
//! through the narrow [`LongTermBackend`] trait (`search` + `add`) and ships
//! adapters for the backends it knows:
//!
//! - [`http`] — a mem0-style REST API, one adapter per API version.
//! - [`blocking`] — wraps a synchronous client so its calls run on the
//!   blocking thread pool instead of stalling the turn pipeline.
//!
//! [`LongTermMemory`] sits between the per-turn driver and the backend. It
//! degrades every backend failure to a logged warning: searches return no
//! results, and a failed promotion leaves the batch pending for the next
//! turn. When no backend is configured, what happens to evicted entries is
//! an explicit [`DisabledPolicy`] rather than an implicit success.

pub mod blocking;
pub mod http;

pub use blocking::{BlockingBackend, SyncLongTermStore};
pub use http::{ApiVersion, HttpLongTermBackend};

use crate::error::{MemoryError, Result};
use crate::window::Entry;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of long-term memories fetched per search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Boxed future returned by [`LongTermBackend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// One user/assistant exchange submitted for long-term indexing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl From<&Entry> for Turn {
    fn from(entry: &Entry) -> Self {
        Self {
            user: entry.user.clone(),
            assistant: entry.assistant.clone(),
        }
    }
}

/// Capability set of a long-term memory backend.
///
/// Both calls may fail transiently; callers go through [`LongTermMemory`],
/// which decides how to degrade.
pub trait LongTermBackend: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str {
        "long-term"
    }

    /// Semantic search over the session's memories, at most `limit` texts.
    fn search<'a>(
        &'a self,
        session_id: &'a str,
        query: &'a str,
        limit: usize,
    ) -> BackendFuture<'a, Vec<String>>;

    /// Index the given turns for the session. `Ok` means every turn was
    /// accepted.
    fn add<'a>(&'a self, session_id: &'a str, turns: &'a [Turn]) -> BackendFuture<'a, ()>;
}

/// What promotion does when no backend is configured.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisabledPolicy {
    /// Report success and let the caller drop the batch. The turns are gone
    /// for good: nothing was written anywhere.
    #[default]
    Discard,
    /// Keep pending entries in the window until a backend is configured.
    Retain,
}

/// Result of one promotion attempt.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum PromotionOutcome {
    /// Nothing was evicted this turn.
    Empty,
    /// The backend accepted this many entries.
    Promoted(usize),
    /// No backend; this many entries were dropped under [`DisabledPolicy::Discard`].
    Discarded(usize),
    /// No backend; this many entries stay pending under [`DisabledPolicy::Retain`].
    Retained(usize),
    /// The backend failed or timed out; the batch stays pending.
    Failed,
}

impl PromotionOutcome {
    /// Whether the caller should remove the batch from the window.
    pub fn should_remove(&self) -> bool {
        matches!(self, Self::Promoted(_) | Self::Discarded(_))
    }

    /// Whether the promotion step completed without leaving work behind.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Empty | Self::Promoted(_) | Self::Discarded(_))
    }
}

/// Coordinator between the turn driver and an optional backend.
#[derive(Clone)]
pub struct LongTermMemory {
    backend: Option<Arc<dyn LongTermBackend>>,
    disabled_policy: DisabledPolicy,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for LongTermMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongTermMemory")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("disabled_policy", &self.disabled_policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LongTermMemory {
    fn default() -> Self {
        Self::disabled(DisabledPolicy::default())
    }
}

impl LongTermMemory {
    /// Coordinator backed by `backend`.
    pub fn new(backend: Arc<dyn LongTermBackend>) -> Self {
        Self {
            backend: Some(backend),
            disabled_policy: DisabledPolicy::default(),
            timeout: None,
        }
    }

    /// Coordinator with no backend.
    pub fn disabled(policy: DisabledPolicy) -> Self {
        Self {
            backend: None,
            disabled_policy: policy,
            timeout: None,
        }
    }

    /// Bound every backend call by `timeout`. A timed-out add counts as a
    /// failed promotion.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn disabled_policy(&self) -> DisabledPolicy {
        self.disabled_policy
    }

    async fn bounded<T>(&self, fut: BackendFuture<'_, T>) -> Result<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| MemoryError::Timeout(limit))?,
            None => fut.await,
        }
    }

    /// Search long-term memory. Returns an empty list when disabled or on
    /// any backend error.
    pub async fn search(&self, session_id: &str, query: &str, limit: usize) -> Vec<String> {
        let Some(backend) = self.backend.as_ref() else {
            return Vec::new();
        };
        match self.bounded(backend.search(session_id, query, limit)).await {
            Ok(memories) => {
                debug!(
                    "{} search for session {session_id}: {} hit(s)",
                    backend.name(),
                    memories.len()
                );
                memories
            }
            Err(e) => {
                warn!("{} search failed (session={session_id}): {e}", backend.name());
                Vec::new()
            }
        }
    }

    /// Submit a promotion batch.
    ///
    /// Never returns an error: a backend failure becomes
    /// [`PromotionOutcome::Failed`] and the entries are retried when a later
    /// turn evicts again.
    pub async fn promote(&self, session_id: &str, batch: &[Entry]) -> PromotionOutcome {
        if batch.is_empty() {
            return PromotionOutcome::Empty;
        }

        let Some(backend) = self.backend.as_ref() else {
            return match self.disabled_policy {
                DisabledPolicy::Discard => {
                    info!(
                        "Long-term memory disabled, discarding {} pending entries for session {session_id}",
                        batch.len()
                    );
                    PromotionOutcome::Discarded(batch.len())
                }
                DisabledPolicy::Retain => {
                    debug!(
                        "Long-term memory disabled, keeping {} pending entries for session {session_id}",
                        batch.len()
                    );
                    PromotionOutcome::Retained(batch.len())
                }
            };
        };

        let turns: Vec<Turn> = batch.iter().map(Turn::from).collect();
        match self.bounded(backend.add(session_id, &turns)).await {
            Ok(()) => {
                debug!(
                    "Promoted {} entries to {} for session {session_id}",
                    turns.len(),
                    backend.name()
                );
                PromotionOutcome::Promoted(turns.len())
            }
            Err(e) => {
                warn!(
                    "{} add failed (session={session_id}): {e}; {} entries stay pending for retry",
                    backend.name(),
                    turns.len()
                );
                PromotionOutcome::Failed
            }
        }
    }
}

/// Format long-term memories for injection into a system prompt.
///
/// Returns an empty string when there is nothing to inject.
pub fn format_long_term_for_system(memories: &[String]) -> String {
    if memories.is_empty() {
        return String::new();
    }
    let mut out = String::from("[Long-term memory]");
    for m in memories {
        out.push_str("\n- ");
        out.push_str(m);
    }
    out
}
