//! Per-session short-term conversation memory with sliding eviction into a
//! long-term semantic memory store.
//!
//! `chatmem-rs` is called once per conversational turn by a chat host. After
//! each reply the user/assistant exchange is appended to the session's
//! window. When the number of `active` entries exceeds the capacity (30 by
//! default), the oldest are reclassified `pending` and submitted to a
//! long-term backend. Pending entries leave the window only after the backend
//! confirms the add, so a failed promotion is retried on a later turn.
//!
//! # Getting started
//!
//! ```ignore
//! use chatmem_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MemoryError> {
//!     let config = MemoryConfig::default()
//!         .with_data_dir("data")
//!         .with_long_term(LongTermSettings::new("http://localhost:8000"));
//!     let memory = ShortTermMemory::from_config(&config)?;
//!
//!     // Replay the stored window as context for the next request.
//!     let context = memory.get_context_messages("telegram:42").await;
//!
//!     // After the model replies, record the turn.
//!     let report = memory
//!         .process_turn("telegram:42", "What's my cat called?", "Miso.")
//!         .await?;
//!     println!("{} pending", report.pending_count);
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Record turns and read context:** [`ShortTermMemory`](memory::ShortTermMemory).
//!   It owns the store, the long-term coordinator, and the per-session lock
//!   registry.
//! - **Hook into a host's request/response cycle:** [`MemoryPlugin`](plugin::MemoryPlugin)
//!   adds long-term recall before the request and auditing after the reply.
//! - **Change where windows live:** implement [`WindowStore`](store::WindowStore),
//!   or use [`FileWindowStore`](store::FileWindowStore) /
//!   [`InMemoryWindowStore`](store::InMemoryWindowStore).
//! - **Connect a long-term store:** implement [`LongTermBackend`](longterm::LongTermBackend),
//!   use the mem0-style [`HttpLongTermBackend`](longterm::HttpLongTermBackend), or
//!   wrap a synchronous client in [`BlockingBackend`](longterm::BlockingBackend).
//! - **Decide what happens without a backend:** [`DisabledPolicy`](longterm::DisabledPolicy).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`window`] | [`Entry`](window::Entry) / [`Window`](window::Window) model, sliding eviction, context projection |
//! | [`store`] | Window persistence: file and in-memory stores |
//! | [`longterm`] | Backend trait, promotion coordinator, HTTP and blocking adapters |
//! | [`session`] | Per-session async lock registry |
//! | [`memory`] | Per-turn driver |
//! | [`plugin`] | Host request/response hooks |
//! | [`audit`] | Daily JSONL audit trail |
//! | [`config`] | JSON-loadable configuration |

pub mod audit;
pub mod config;
pub mod error;
pub mod longterm;
pub mod memory;
pub mod plugin;
pub mod prelude;
pub mod session;
pub mod store;
pub mod window;

use serde::{Deserialize, Serialize};

pub use error::{MemoryError, Result};

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A chat message in the `{"role", "content"}` shape chat-completion APIs
/// accept.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}
