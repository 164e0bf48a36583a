//! Adapter for mem0-style long-term memory REST APIs.
//!
//! Endpoints:
//!
//! | Call | v1 | v2 |
//! |------|----|----|
//! | add | `POST /v1/memories/` | `POST /v1/memories/` |
//! | search | `POST /v1/memories/search/` with `limit` | `POST /v2/memories/search/` with `top_k` and `filters` |
//!
//! The version difference lives entirely in [`ApiVersion`]; nothing outside
//! this module knows which parameter name a server expects.
//!
//! Search responses come in several shapes depending on server version: a bare
//! list, `{"results": [...]}`, or `{"memories": [...]}`, where each item is
//! either a string or an object carrying `memory`, `text`, or `content`. All
//! of them normalize to a flat list of non-empty texts.

use super::{BackendFuture, LongTermBackend, Turn};
use crate::Message;
use crate::config::LongTermSettings;
use crate::error::{MemoryError, Result};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::debug;

/// Server API generation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// Search takes `user_id` and `limit`.
    V1,
    /// Search takes `filters.user_id` and `top_k`.
    #[default]
    V2,
}

impl ApiVersion {
    fn search_path(self) -> &'static str {
        match self {
            ApiVersion::V1 => "/v1/memories/search/",
            ApiVersion::V2 => "/v2/memories/search/",
        }
    }

    fn search_body(self, session_id: &str, query: &str, limit: usize) -> serde_json::Value {
        match self {
            ApiVersion::V1 => json!({
                "query": query,
                "user_id": session_id,
                "limit": limit,
            }),
            ApiVersion::V2 => json!({
                "query": query,
                "filters": { "user_id": session_id },
                "top_k": limit,
            }),
        }
    }
}

const ADD_PATH: &str = "/v1/memories/";

// ── Response normalization ─────────────────────────────────────────

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SearchResponse {
    List(Vec<SearchHit>),
    Results { results: Vec<SearchHit> },
    Memories { memories: Vec<SearchHit> },
    Other(IgnoredAny),
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SearchHit {
    Text(String),
    Record {
        #[serde(default)]
        memory: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Other(IgnoredAny),
}

impl SearchHit {
    fn into_text(self) -> Option<String> {
        let text = match self {
            SearchHit::Text(s) => Some(s),
            SearchHit::Record {
                memory,
                text,
                content,
            } => [memory, text, content]
                .into_iter()
                .flatten()
                .find(|s| !s.is_empty()),
            SearchHit::Other(_) => None,
        };
        text.filter(|s| !s.is_empty())
    }
}

fn parse_search_response(body: &str) -> Result<Vec<String>> {
    let hits = match serde_json::from_str::<SearchResponse>(body)? {
        SearchResponse::List(hits)
        | SearchResponse::Results { results: hits }
        | SearchResponse::Memories { memories: hits } => hits,
        SearchResponse::Other(_) => Vec::new(),
    };
    Ok(hits.into_iter().filter_map(SearchHit::into_text).collect())
}

// ── Client ─────────────────────────────────────────────────────────

/// Long-term backend speaking a mem0-style REST API.
pub struct HttpLongTermBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    version: ApiVersion,
}

impl HttpLongTermBackend {
    /// Build a client from normalized settings.
    pub fn new(settings: &LongTermSettings) -> Result<Self> {
        let settings = settings.clone().normalized()?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("chatmem-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| MemoryError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.base_url,
            api_key: settings.api_key,
            version: settings.api_version,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let start = Instant::now();

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Token {key}"));
        }
        let resp = request
            .send()
            .await
            .map_err(|e| MemoryError::Backend(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| MemoryError::Backend(format!("failed to read response: {e}")))?;

        debug!(
            "mem0 {path}: HTTP {status} in {:.2}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(MemoryError::Backend(format!(
                "mem0 API HTTP {status}: {text}"
            )));
        }
        Ok(text)
    }

    async fn search_memories(
        &self,
        session_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let body = self.version.search_body(session_id, query, limit);
        let text = self.post(self.version.search_path(), &body).await?;
        let mut memories = parse_search_response(&text)?;
        memories.truncate(limit);
        Ok(memories)
    }

    /// One request per turn, in order. The first failure aborts the batch;
    /// turns already accepted will be sent again on retry.
    async fn add_turns(&self, session_id: &str, turns: &[Turn]) -> Result<()> {
        for turn in turns {
            let body = json!({
                "messages": [
                    Message::user(turn.user.as_str()),
                    Message::assistant(turn.assistant.as_str()),
                ],
                "user_id": session_id,
            });
            self.post(ADD_PATH, &body).await?;
        }
        Ok(())
    }
}

impl LongTermBackend for HttpLongTermBackend {
    fn name(&self) -> &str {
        "mem0"
    }

    fn search<'a>(
        &'a self,
        session_id: &'a str,
        query: &'a str,
        limit: usize,
    ) -> BackendFuture<'a, Vec<String>> {
        Box::pin(self.search_memories(session_id, query, limit))
    }

    fn add<'a>(&'a self, session_id: &'a str, turns: &'a [Turn]) -> BackendFuture<'a, ()> {
        Box::pin(self.add_turns(session_id, turns))
    }
}
