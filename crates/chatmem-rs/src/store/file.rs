//! JSON-file window store.
//!
//! Directory layout:
//! ```text
//! dir/
//!   aiocqhttp_GroupMessage_12345.json
//!   webchat_alice.json
//! ```

use super::{StoreFuture, WindowStore, record_key};
use crate::error::{MemoryError, Result};
use crate::window::{Entry, Window};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk shape of a window. Both fields are optional so that partial
/// records still load.
#[derive(Deserialize)]
struct StoredWindow {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    entries: Vec<Entry>,
}

/// Window store backed by one JSON file per session.
#[derive(Debug, Clone)]
pub struct FileWindowStore {
    dir: PathBuf,
}

impl FileWindowStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `session_id`.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", record_key(session_id)))
    }

    async fn load_window(&self, session_id: &str) -> Window {
        let path = self.path_for(session_id);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored window for session {session_id}");
                return Window::new(session_id);
            }
            Err(e) => {
                warn!(
                    "Failed to read window for session {session_id} at {}: {e}",
                    path.display()
                );
                return Window::new(session_id);
            }
        };

        let stored: StoredWindow = match serde_json::from_str(&json) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(
                    "Ignoring malformed window for session {session_id} at {}: {e}",
                    path.display()
                );
                return Window::new(session_id);
            }
        };

        if !stored.session_id.is_empty() && stored.session_id != session_id {
            warn!(
                "Window file {} belongs to session {}, loading it for {session_id}",
                path.display(),
                stored.session_id
            );
        }

        Window::from_entries(session_id, stored.entries)
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    async fn save_window(&self, window: &Window) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MemoryError::io(&self.dir, e))?;

        let key = record_key(&window.session_id);
        let final_path = self.dir.join(format!("{key}.json"));
        // Colliding keys may be saved concurrently under different session
        // locks, so every write gets its own temp file.
        let tmp_path = self.dir.join(format!(
            ".{key}.json.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let json = serde_json::to_string_pretty(window)?;
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| MemoryError::io(&tmp_path, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(MemoryError::io(&final_path, e));
        }

        info!(
            "Saved window for session {} ({} entries, {} pending) to {}",
            window.session_id,
            window.len(),
            window.pending_count(),
            final_path.display()
        );
        Ok(())
    }
}

impl WindowStore for FileWindowStore {
    fn load<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Window> {
        Box::pin(self.load_window(session_id))
    }

    fn save<'a>(&'a self, window: &'a Window) -> StoreFuture<'a, Result<()>> {
        Box::pin(self.save_window(window))
    }
}
