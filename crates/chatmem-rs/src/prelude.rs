//! Convenience re-exports for common `chatmem-rs` types.
//!
//! ```ignore
//! use chatmem_rs::prelude::*;
//! ```
//!
//! Covers what a host needs to record turns and replay context. Adapter
//! internals and the pure window functions stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{MemoryError, Message, MessageRole, Result};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::{LongTermSettings, MemoryConfig};

// ── Driver and host hooks ───────────────────────────────────────────
pub use crate::memory::{ShortTermMemory, TurnReport};
pub use crate::plugin::{MemoryPlugin, RequestContext, TurnRecord};

// ── Storage and long-term memory ────────────────────────────────────
pub use crate::longterm::{DisabledPolicy, LongTermBackend, LongTermMemory, PromotionOutcome};
pub use crate::store::{FileWindowStore, InMemoryWindowStore, WindowStore};
pub use crate::window::{Entry, EntryTag, Window};
