//! Process-local window store.

use super::{StoreFuture, WindowStore};
use crate::error::Result;
use crate::window::{Entry, Window};
use std::collections::HashMap;
use std::sync::Mutex;

/// Window store that keeps records in a map for the life of the process.
///
/// Records are keyed by the raw session ID, so no two sessions ever share a
/// record here (unlike file names, which are sanitized).
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    records: Mutex<HashMap<String, Vec<Entry>>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a saved record.
    pub fn session_count(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl WindowStore for InMemoryWindowStore {
    fn load<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Window> {
        Box::pin(async move {
            let entries = self
                .records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(session_id)
                .cloned();
            match entries {
                Some(entries) => Window::from_entries(session_id, entries),
                None => Window::new(session_id),
            }
        })
    }

    fn save<'a>(&'a self, window: &'a Window) -> StoreFuture<'a, Result<()>> {
        Box::pin(async move {
            self.records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(window.session_id.clone(), window.entries.clone());
            Ok(())
        })
    }
}
