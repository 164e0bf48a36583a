//! Configuration for the memory window, the long-term backend, and the audit log.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "data_dir": "data",
//!   "capacity": 30,
//!   "long_term": { "api_base": "http://localhost:8000", "apiKey": "..." },
//!   "audit": { "enabled": false }
//! }
//! ```
//!
//! Leaving out `long_term` disables promotion; `disabled_policy` then decides
//! what happens to evicted entries.

use crate::error::{MemoryError, Result};
use crate::longterm::{ApiVersion, DEFAULT_SEARCH_LIMIT, DisabledPolicy};
use crate::window::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "MEM0_API_KEY";

/// Default per-request HTTP timeout for the long-term backend.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// ── Toggle ─────────────────────────────────────────────────────────

/// An optional module: an enabled flag plus its configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Toggle<T: Default> {
    /// Whether this module is active.
    pub enabled: bool,
    /// Module-specific configuration, flattened next to `enabled`.
    #[serde(flatten)]
    pub config: T,
}

impl<T: Default> Toggle<T> {
    /// A disabled instance with default inner config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            config: T::default(),
        }
    }
}

impl<T: Default> Default for Toggle<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            config: T::default(),
        }
    }
}

/// Audit log settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory for daily JSONL files. Default: `<data_dir>/audit_logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

// ── Long-term backend ──────────────────────────────────────────────

/// Connection settings for a mem0-style long-term memory server.
///
/// Accepts the key spellings found in host configs: `api_base` or
/// `openai_base_url` for the URL, `apiKey` for the key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LongTermSettings {
    #[serde(alias = "api_base", alias = "openai_base_url")]
    pub base_url: String,
    #[serde(default, alias = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_version: ApiVersion,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl LongTermSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            api_version: ApiVersion::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Trim the base URL, drop blank keys, and fall back to
    /// [`API_KEY_ENV`] when no key is set.
    pub fn normalized(mut self) -> Result<Self> {
        let base = self.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(MemoryError::Config(
                "long_term.base_url must not be empty".into(),
            ));
        }
        self.base_url = base.to_string();

        if self.request_timeout_secs == 0 {
            return Err(MemoryError::Config(
                "long_term.request_timeout_secs must be positive".into(),
            ));
        }

        self.api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            });
        Ok(self)
    }
}

// ── Top-level config ───────────────────────────────────────────────

/// Settings for a [`ShortTermMemory`](crate::memory::ShortTermMemory) and
/// the [`MemoryPlugin`](crate::plugin::MemoryPlugin) around it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Root for all persisted state. Windows live in
    /// `<data_dir>/short_term_memory`.
    pub data_dir: PathBuf,
    /// Maximum active entries per window.
    pub capacity: usize,
    /// Long-term memories fetched per request.
    pub search_limit: usize,
    /// Upper bound on each long-term backend call. None waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_timeout_secs: Option<u64>,
    pub disabled_policy: DisabledPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_term: Option<LongTermSettings>,
    pub audit: Toggle<AuditConfig>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            capacity: DEFAULT_CAPACITY,
            search_limit: DEFAULT_SEARCH_LIMIT,
            backend_timeout_secs: None,
            disabled_policy: DisabledPolicy::default(),
            long_term: None,
            audit: Toggle::default(),
        }
    }
}

impl MemoryConfig {
    /// Load a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| MemoryError::io(path, e))?;
        Self::from_json_str(&raw)
    }

    /// Parse and normalize a JSON config.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.normalized()
    }

    /// Normalize nested settings. Called by the loaders; call it yourself
    /// after building a config in code if the long-term URL came from user
    /// input.
    pub fn normalized(mut self) -> Result<Self> {
        self.long_term = self.long_term.map(LongTermSettings::normalized).transpose()?;
        Ok(self)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Set the backend timeout. It is stored in whole seconds, so any
    /// fraction rounds up (500 ms becomes 1 s, 1.9 s becomes 2 s).
    pub fn with_backend_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.backend_timeout_secs =
            timeout.map(|t| (t.as_secs() + u64::from(t.subsec_nanos() > 0)).max(1));
        self
    }

    pub fn with_disabled_policy(mut self, policy: DisabledPolicy) -> Self {
        self.disabled_policy = policy;
        self
    }

    pub fn with_long_term(mut self, settings: LongTermSettings) -> Self {
        self.long_term = Some(settings);
        self
    }

    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit.enabled = enabled;
        self
    }

    /// Directory holding one JSON record per session.
    pub fn windows_dir(&self) -> PathBuf {
        self.data_dir.join("short_term_memory")
    }

    /// Directory holding the daily audit files.
    pub fn audit_dir(&self) -> PathBuf {
        self.audit
            .config
            .dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("audit_logs"))
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        self.backend_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = MemoryConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MemoryConfig::default());
        assert_eq!(config.capacity, 30);
        assert_eq!(config.search_limit, 5);
        assert_eq!(config.windows_dir(), PathBuf::from("data/short_term_memory"));
        assert_eq!(config.audit_dir(), PathBuf::from("data/audit_logs"));
        assert!(config.audit.enabled);
        assert!(config.long_term.is_none());
        assert!(config.backend_timeout().is_none());
    }

    #[test]
    fn host_style_keys_are_accepted() {
        let config = MemoryConfig::from_json_str(
            r#"{
                "data_dir": "/var/lib/bot",
                "capacity": 10,
                "backend_timeout_secs": 15,
                "disabled_policy": "retain",
                "long_term": {
                    "api_base": "http://mem0.local:8000///",
                    "apiKey": " secret ",
                    "api_version": "v1"
                },
                "audit": { "enabled": false, "dir": "/tmp/audit" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.capacity, 10);
        assert_eq!(config.disabled_policy, DisabledPolicy::Retain);
        assert_eq!(config.backend_timeout(), Some(Duration::from_secs(15)));
        assert!(!config.audit.enabled);
        assert_eq!(config.audit_dir(), PathBuf::from("/tmp/audit"));

        let lt = config.long_term.unwrap();
        assert_eq!(lt.base_url, "http://mem0.local:8000");
        assert_eq!(lt.api_key.as_deref(), Some("secret"));
        assert_eq!(lt.api_version, ApiVersion::V1);
        assert_eq!(lt.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn openai_base_url_alias() {
        let lt: LongTermSettings =
            serde_json::from_str(r#"{"openai_base_url": "http://x"}"#).unwrap();
        assert_eq!(lt.base_url, "http://x");
        assert_eq!(lt.api_version, ApiVersion::V2);
    }

    #[test]
    fn blank_base_url_is_rejected() {
        let err = MemoryConfig::from_json_str(r#"{"long_term": {"base_url": " / "}}"#).unwrap_err();
        assert!(matches!(err, MemoryError::Config(m) if m.contains("base_url")));
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let settings = LongTermSettings {
            request_timeout_secs: 0,
            ..LongTermSettings::new("http://x")
        };
        assert!(matches!(settings.normalized(), Err(MemoryError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_serialize_error() {
        assert!(matches!(
            MemoryConfig::from_json_str("{capacity: 3}"),
            Err(MemoryError::Serialize(_))
        ));
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, r#"{"capacity": 4, "search_limit": 2}"#).unwrap();

        let config = MemoryConfig::from_file(&path).unwrap();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.search_limit, 2);

        let missing = MemoryConfig::from_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(MemoryError::Io { .. })));
    }

    #[test]
    fn builders_compose() {
        let config = MemoryConfig::default()
            .with_data_dir("/srv/mem")
            .with_capacity(3)
            .with_search_limit(8)
            .with_backend_timeout(Some(Duration::from_secs(5)))
            .with_disabled_policy(DisabledPolicy::Retain)
            .with_long_term(LongTermSettings::new("http://x").with_api_key("k"))
            .with_audit(false);

        assert_eq!(config.windows_dir(), PathBuf::from("/srv/mem/short_term_memory"));
        assert_eq!(config.capacity, 3);
        assert_eq!(config.search_limit, 8);
        assert_eq!(config.backend_timeout_secs, Some(5));
        assert!(!config.audit.enabled);
        assert_eq!(
            config.long_term.as_ref().and_then(|l| l.api_key.as_deref()),
            Some("k")
        );
    }

    #[test]
    fn backend_timeout_rounds_up_to_whole_seconds() {
        let secs = |d: Duration| {
            MemoryConfig::default()
                .with_backend_timeout(Some(d))
                .backend_timeout()
        };
        assert_eq!(secs(Duration::from_millis(500)), Some(Duration::from_secs(1)));
        assert_eq!(secs(Duration::from_millis(1900)), Some(Duration::from_secs(2)));
        assert_eq!(secs(Duration::from_secs(3)), Some(Duration::from_secs(3)));
        assert_eq!(secs(Duration::ZERO), Some(Duration::from_secs(1)));
        assert!(
            MemoryConfig::default()
                .with_backend_timeout(None)
                .backend_timeout()
                .is_none()
        );
    }

    #[test]
    fn toggle_defaults_to_enabled() {
        let t: Toggle<AuditConfig> = serde_json::from_str("{}").unwrap();
        assert!(t.enabled);
        assert!(!Toggle::<AuditConfig>::disabled().enabled);
    }
}
