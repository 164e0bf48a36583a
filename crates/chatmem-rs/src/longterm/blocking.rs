//! Run synchronous long-term clients off the async executor.
//!
//! Some memory clients only offer blocking calls (embedded vector stores,
//! FFI bindings). [`BlockingBackend`] moves each call onto tokio's blocking
//! pool with `spawn_blocking`, so a slow add for one session never stalls
//! turns for other sessions.

use super::{BackendFuture, LongTermBackend, Turn};
use crate::error::{MemoryError, Result};
use std::sync::Arc;

/// A long-term client with blocking `search` and `add`.
pub trait SyncLongTermStore: Send + Sync + 'static {
    fn search(&self, session_id: &str, query: &str, limit: usize) -> Result<Vec<String>>;
    fn add(&self, session_id: &str, turns: &[Turn]) -> Result<()>;
}

/// Async [`LongTermBackend`] over a [`SyncLongTermStore`].
pub struct BlockingBackend<S> {
    inner: Arc<S>,
    name: String,
}

impl<S: SyncLongTermStore> BlockingBackend<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            name: "blocking".to_string(),
        }
    }

    /// Label used in log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

fn join_error(op: &str, e: tokio::task::JoinError) -> MemoryError {
    MemoryError::Backend(format!("blocking {op} task failed: {e}"))
}

impl<S: SyncLongTermStore> LongTermBackend for BlockingBackend<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn search<'a>(
        &'a self,
        session_id: &'a str,
        query: &'a str,
        limit: usize,
    ) -> BackendFuture<'a, Vec<String>> {
        let inner = self.inner.clone();
        let session_id = session_id.to_string();
        let query = query.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || inner.search(&session_id, &query, limit))
                .await
                .map_err(|e| join_error("search", e))?
        })
    }

    fn add<'a>(&'a self, session_id: &'a str, turns: &'a [Turn]) -> BackendFuture<'a, ()> {
        let inner = self.inner.clone();
        let session_id = session_id.to_string();
        let turns = turns.to_vec();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || inner.add(&session_id, &turns))
                .await
                .map_err(|e| join_error("add", e))?
        })
    }
}
