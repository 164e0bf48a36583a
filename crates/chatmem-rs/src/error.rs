//! Error type shared by the store, the long-term backends, and the driver.
//!
//! Most failures in this crate degrade locally (a corrupt record loads as an
//! empty window, a failed backend add leaves entries pending). The variants
//! here are the ones that still need to reach a caller: a window save that
//! did not happen, a backend error the coordinator turns into a retry, and
//! configuration that cannot be used.

use std::path::PathBuf;
use std::time::Duration;

/// Errors produced by `chatmem-rs`.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Filesystem I/O failed at the given path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded or decoded as JSON.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The long-term backend rejected or failed a request.
    #[error("long-term backend error: {0}")]
    Backend(String),

    /// A backend call did not finish within the configured timeout.
    #[error("long-term backend timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration is missing a required value or is malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MemoryError {
    /// Wrap an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MemoryError>;
