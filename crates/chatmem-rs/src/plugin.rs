//! Host lifecycle hooks around an LLM call.
//!
//! A chat host calls [`MemoryPlugin::on_llm_request`] before sending a
//! request and [`MemoryPlugin::on_llm_response`] after the reply arrives:
//!
//! ```ignore
//! let plugin = MemoryPlugin::from_config(&config)?;
//!
//! let ctx = plugin.on_llm_request(session_id, &prompt).await;
//! let system = ctx.apply_to_system_prompt(base_system_prompt);
//! // send `system`, `ctx.context`, and `prompt` to the model ...
//!
//! let record = ctx.turn_record(Some(system), prompt, reply);
//! plugin.on_llm_response(record).await?;
//! ```
//!
//! The request hook only reads. The response hook records the turn in
//! short-term memory (which may promote older turns) and then appends an
//! audit record when auditing is enabled.

use crate::Message;
use crate::audit::{AuditLog, AuditRecord};
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::longterm::{DEFAULT_SEARCH_LIMIT, format_long_term_for_system};
use crate::memory::{ShortTermMemory, TurnReport};
use tracing::debug;

/// Memory prepared for one outgoing LLM request.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub session_id: String,
    /// Long-term memories found for the prompt.
    pub long_term: Vec<String>,
    /// Formatted block for the system prompt; empty when nothing was found.
    pub system_addendum: String,
    /// Stored window replayed as user/assistant pairs.
    pub context: Vec<Message>,
}

impl RequestContext {
    /// `system_prompt` followed by the long-term block, if any.
    pub fn apply_to_system_prompt(&self, system_prompt: &str) -> String {
        match (system_prompt.is_empty(), self.system_addendum.is_empty()) {
            (_, true) => system_prompt.to_string(),
            (true, false) => self.system_addendum.clone(),
            (false, false) => format!("{system_prompt}\n\n{}", self.system_addendum),
        }
    }

    /// Start a [`TurnRecord`] carrying what this request injected.
    pub fn turn_record(
        &self,
        system_prompt: Option<String>,
        user_message: impl Into<String>,
        assistant_reply: impl Into<String>,
    ) -> TurnRecord {
        TurnRecord {
            session_id: self.session_id.clone(),
            user_message: user_message.into(),
            assistant_reply: assistant_reply.into(),
            system_prompt,
            context: self.context.clone(),
            long_term_injected: self.long_term.clone(),
            ..Default::default()
        }
    }
}

/// A completed exchange as reported by the host.
#[derive(Clone, Debug, Default)]
pub struct TurnRecord {
    pub session_id: String,
    pub user_id: Option<String>,
    pub user_message: String,
    pub assistant_reply: String,
    /// System prompt actually sent, including any long-term block.
    pub system_prompt: Option<String>,
    /// Prior messages sent with the request.
    pub context: Vec<Message>,
    pub long_term_injected: Vec<String>,
    pub model: Option<String>,
    pub token_usage: Option<u32>,
}

impl TurnRecord {
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_token_usage(mut self, total: u32) -> Self {
        self.token_usage = Some(total);
        self
    }

    /// The messages the model saw: system prompt, prior context, then the
    /// current user message.
    pub fn context_snapshot(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.context.len() + 2);
        if let Some(system) = self.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(Message::system(system));
        }
        messages.extend(self.context.iter().cloned());
        messages.push(Message::user(self.user_message.as_str()));
        messages
    }

    fn to_audit(&self, pending_count: usize) -> AuditRecord {
        AuditRecord {
            user_id: self.user_id.clone(),
            user_message: self.user_message.clone(),
            assistant_reply: self.assistant_reply.clone(),
            long_term_injected: self.long_term_injected.clone(),
            context_snapshot: self.context_snapshot(),
            pending_count,
            model: self.model.clone(),
            token_usage: self.token_usage,
            ..AuditRecord::now(self.session_id.as_str())
        }
    }
}

/// Short-term memory, long-term recall, and auditing behind two hooks.
#[derive(Debug)]
pub struct MemoryPlugin {
    memory: ShortTermMemory,
    audit: Option<AuditLog>,
    search_limit: usize,
}

impl MemoryPlugin {
    pub fn new(memory: ShortTermMemory) -> Self {
        Self {
            memory,
            audit: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Result<Self> {
        let mut plugin =
            Self::new(ShortTermMemory::from_config(config)?).with_search_limit(config.search_limit);
        if config.audit.enabled {
            plugin = plugin.with_audit(AuditLog::new(config.audit_dir()));
        }
        Ok(plugin)
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn memory(&self) -> &ShortTermMemory {
        &self.memory
    }

    pub fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    /// Gather long-term memories for `prompt` and the stored window.
    pub async fn on_llm_request(&self, session_id: &str, prompt: &str) -> RequestContext {
        let long_term = if prompt.trim().is_empty() || self.search_limit == 0 {
            Vec::new()
        } else {
            self.memory
                .recall(session_id, prompt, self.search_limit)
                .await
        };
        let context = self.memory.get_context_messages(session_id).await;
        debug!(
            "Prepared request for session {session_id}: {} long-term, {} context messages",
            long_term.len(),
            context.len()
        );

        RequestContext {
            session_id: session_id.to_string(),
            system_addendum: format_long_term_for_system(&long_term),
            long_term,
            context,
        }
    }

    /// Record the exchange, then audit it.
    ///
    /// The audit record is written even when recording fails, with a
    /// pending count of zero; the recording error is still returned.
    pub async fn on_llm_response(&self, record: TurnRecord) -> Result<TurnReport> {
        let result = self
            .memory
            .process_turn(
                &record.session_id,
                &record.user_message,
                &record.assistant_reply,
            )
            .await;

        if let Some(audit) = &self.audit {
            let pending_count = result.as_ref().map_or(0, |r| r.pending_count);
            audit.append(&record.to_audit(pending_count)).await;
        }
        result
    }
}
