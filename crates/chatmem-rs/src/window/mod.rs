//! Short-term conversation window: tagged entries, eviction, and projection.
//!
//! A [`Window`] holds one session's recent turns in insertion order. Each
//! [`Entry`] is tagged:
//!
//! - **`active`** — inside the retention window, replayed into LLM context.
//! - **`pending`** — evicted from the active set and waiting to be promoted
//!   into long-term memory. Pending entries stay in the window (and on disk)
//!   until the long-term backend confirms the add.
//!
//! The submodules hold the pure transformations on a window:
//!
//! 1. **[`eviction`]** — [`slide_and_collect_pending`] reclassifies the oldest
//!    active entries once the active count exceeds capacity, and
//!    [`remove_promoted`] drops a batch after a successful promotion.
//! 2. **[`projection`]** — [`entries_to_context_messages`] turns entries into
//!    the user/assistant message pairs the context assembler consumes.
//!
//! Entries carry a per-window sequence number assigned at append time. That
//! number, not the entry text, is what removal matches on.

pub mod eviction;
pub mod projection;

pub use eviction::{DEFAULT_CAPACITY, remove_promoted, slide_and_collect_pending};
pub use projection::entries_to_context_messages;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Entry ──────────────────────────────────────────────────────────

/// Retention state of a window entry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryTag {
    /// Within the retention window.
    #[default]
    Active,
    /// Evicted and queued for long-term promotion.
    Pending,
}

impl std::fmt::Display for EntryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryTag::Active => write!(f, "active"),
            EntryTag::Pending => write!(f, "pending"),
        }
    }
}

/// One conversational turn.
///
/// Fields missing from a stored record fall back to their defaults so that
/// records written by older versions still load.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    #[serde(default)]
    pub tag: EntryTag,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub assistant: String,
    /// ISO-8601 UTC creation time. Set once at append.
    #[serde(default)]
    pub timestamp: String,
    /// Sequence number unique within the window; `0` means unassigned.
    #[serde(default)]
    pub seq: u64,
}

impl Entry {
    pub fn is_active(&self) -> bool {
        self.tag == EntryTag::Active
    }

    pub fn is_pending(&self) -> bool {
        self.tag == EntryTag::Pending
    }
}

// ── Window ─────────────────────────────────────────────────────────

/// One session's ordered collection of turns, oldest first.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Window {
    pub session_id: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Window {
    /// An empty window for `session_id`.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            entries: Vec::new(),
        }
    }

    /// Build a window from stored entries.
    ///
    /// Entries without a sequence number, or with one that repeats, come from
    /// older or hand-edited records. In that case every entry is renumbered
    /// in stored order so removal by sequence stays exact.
    pub fn from_entries(session_id: impl Into<String>, mut entries: Vec<Entry>) -> Self {
        let mut seen = HashSet::with_capacity(entries.len());
        let consistent = entries.iter().all(|e| e.seq != 0 && seen.insert(e.seq));
        if !consistent {
            for (i, entry) in entries.iter_mut().enumerate() {
                entry.seq = i as u64 + 1;
            }
        }
        Self {
            session_id: session_id.into(),
            entries,
        }
    }

    /// Append the current exchange as a new `active` entry stamped with the
    /// current UTC time. Returns the entry's sequence number.
    pub fn append_turn(
        &mut self,
        user_content: impl Into<String>,
        assistant_content: impl Into<String>,
    ) -> u64 {
        let seq = self.entries.iter().map(|e| e.seq).max().unwrap_or(0) + 1;
        self.entries.push(Entry {
            tag: EntryTag::Active,
            user: user_content.into(),
            assistant: assistant_content.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            seq,
        });
        seq
    }

    /// Number of entries waiting for long-term promotion.
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// Number of entries inside the retention window.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active()).count()
    }

    /// Active entries in insertion order.
    pub fn active_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_active())
    }

    /// Pending entries in insertion order.
    pub fn pending_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_pending())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
