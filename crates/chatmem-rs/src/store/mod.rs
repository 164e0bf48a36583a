//! Durable per-session window storage.
//!
//! A [`WindowStore`] loads and saves whole windows keyed by session ID. The
//! contract is asymmetric:
//!
//! - **`load`** never fails. A missing record is a new session; an unreadable
//!   or corrupt record is logged and treated as empty.
//! - **`save`** reports every failure. If a save does not happen the turn's
//!   in-memory updates are lost, so the caller has to know.
//!
//! Stores do no locking of their own. [`ShortTermMemory`](crate::memory::ShortTermMemory)
//! holds the session lock across each load/modify/save cycle.
//!
//! Two implementations ship with the crate:
//!
//! - [`FileWindowStore`] — one pretty-printed JSON file per session, written
//!   atomically (temp file + rename).
//! - [`InMemoryWindowStore`] — process-local map, for tests and hosts that
//!   persist elsewhere.

pub mod file;
pub mod memory;

pub use file::FileWindowStore;
pub use memory::InMemoryWindowStore;

use crate::error::Result;
use crate::window::Window;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`WindowStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Load/save of session windows.
///
/// Uses boxed futures so the trait stays dyn-compatible and can be shared as
/// `Arc<dyn WindowStore>`.
pub trait WindowStore: Send + Sync {
    /// Load the window for `session_id`, or an empty one if there is no
    /// usable record.
    fn load<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Window>;

    /// Overwrite the stored record with the full, ordered entry list.
    fn save<'a>(&'a self, window: &'a Window) -> StoreFuture<'a, Result<()>>;
}

/// Storage key for a session: every character that is not alphanumeric,
/// `-`, or `_` becomes `_`.
///
/// Session IDs from chat platforms routinely contain `:` and `/`, which are
/// not valid in file names on every platform.
///
/// The empty ID maps to `"_"` so its record is never a bare `.json`
/// dotfile. It therefore shares a record with `"_"` and any single-character
/// ID that sanitizes to `_`, the same way `x:y` and `x/y` share one.
pub fn record_key(session_id: &str) -> String {
    if session_id.is_empty() {
        return "_".to_string();
    }
    session_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
