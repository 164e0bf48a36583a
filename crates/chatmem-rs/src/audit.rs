//! Append-only audit trail of what the model saw on each turn.
//!
//! One JSON object per line, one file per UTC day:
//!
//! ```text
//! <dir>/2026-03-14.jsonl
//! <dir>/2026-03-15.jsonl
//! ```
//!
//! Auditing never fails a turn. A record that cannot be serialized is
//! written as `{}` and a failed write is logged at `error`.

use crate::Message;
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// One audited LLM exchange.
#[derive(Serialize, Clone, Debug, Default)]
pub struct AuditRecord {
    pub timestamp: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub user_message: String,
    pub assistant_reply: String,
    /// Long-term memories injected into the system prompt for this request.
    pub long_term_injected: Vec<String>,
    /// System prompt, prior context, then the current user message.
    pub context_snapshot: Vec<Message>,
    /// Entries still waiting for promotion after the turn was recorded.
    pub pending_count: usize,
    pub model: Option<String>,
    pub token_usage: Option<u32>,
}

impl AuditRecord {
    /// A record stamped with the current UTC time.
    pub fn now(session_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            session_id: session_id.into(),
            ..Default::default()
        }
    }
}

/// Daily JSONL audit files under one directory.
#[derive(Debug)]
pub struct AuditLog {
    dir: PathBuf,
    // Serializes appends so concurrent turns never interleave partial lines.
    write_lock: Mutex<()>,
}

impl AuditLog {
    /// Create the log, making `dir` if needed. A directory that cannot be
    /// created is logged; writes will then fail and be logged too.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            error!("Failed to create audit log directory {}: {e}", dir.display());
        }
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for a given UTC day.
    pub fn path_for_day(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.jsonl", day.format("%Y-%m-%d")))
    }

    /// File for today (UTC).
    pub fn current_path(&self) -> PathBuf {
        self.path_for_day(Utc::now().date_naive())
    }

    /// Append one record to today's file.
    pub async fn append(&self, record: &AuditRecord) {
        let mut line = safe_json_line(record);
        line.push('\n');
        let path = self.current_path();

        let _guard = self.write_lock.lock().await;
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            error!("Failed to write audit log ({}): {e}", path.display());
        }
    }
}

/// Compact JSON for `value`, or `{}` if it cannot be serialized.
pub fn safe_json_line<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to serialize audit record: {e}");
            "{}".to_string()
        }
    }
}
