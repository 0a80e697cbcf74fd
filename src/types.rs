//! Vendor-neutral streaming types
//!
//! Plain data carriers shared by the parsers, the merger and the stream
//! engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A tool invocation as seen in one chunk.
///
/// `arguments` is a fragment: it only becomes a complete payload once every
/// fragment sharing the same `id` has been concatenated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    /// Tool type (usually "function")
    pub r#type: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    /// Create a function tool call fragment
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type: "function".to_string(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// One decoded wire unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stream identifier, usually only on the first unit
    pub id: Option<String>,
    /// Incremental text, may be empty
    pub content: String,
    /// Speaker role, usually only on the first unit
    pub role: Option<String>,
    /// Model identifier, usually only on the first unit
    pub model: Option<String>,
    /// Set once the stream is ending
    pub finish_reason: Option<String>,
    /// Partial tool invocations carried by this unit
    pub tool_calls: Vec<ToolCall>,
    /// Candidate position when several are requested
    pub index: usize,
    /// Incremental reasoning text, when the provider streams it
    pub thinking: Option<String>,
    /// Token usage, when this unit carries it
    pub usage: Option<Usage>,
    /// The undecoded payload
    pub raw: String,
}

impl Chunk {
    /// Create an empty chunk that remembers its raw payload
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Fully aggregated view of a stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamResponse {
    pub id: Option<String>,
    /// Ordered concatenation of every chunk's content
    pub content: String,
    pub role: Option<String>,
    pub model: Option<String>,
    /// Last non-empty finish reason seen
    pub finish_reason: Option<String>,
    /// Tool calls merged by identifier
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
    /// Concatenated reasoning text, if any
    pub thinking: Option<String>,
    /// Every chunk observed, in arrival order
    #[serde(skip)]
    pub chunks: Vec<Arc<Chunk>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StreamResponse {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Parse the merged arguments of the tool call at `index` as JSON.
    ///
    /// Only meaningful once the stream is terminal; before that the
    /// arguments may still be a fragment.
    pub fn tool_call_arguments_json(
        &self,
        index: usize,
    ) -> Option<Result<serde_json::Value, serde_json::Error>> {
        self.tool_calls
            .get(index)
            .map(|call| serde_json::from_str(&call.arguments))
    }

    /// Fold one chunk into the aggregate.
    ///
    /// id/role/model keep the first non-empty value, finish reason and usage
    /// are last-write-wins, tool calls go through the merger.
    pub(crate) fn apply(&mut self, chunk: Arc<Chunk>) {
        fill_once(&mut self.id, &chunk.id);
        fill_once(&mut self.role, &chunk.role);
        fill_once(&mut self.model, &chunk.model);

        if let Some(reason) = chunk.finish_reason.as_ref().filter(|r| !r.is_empty()) {
            self.finish_reason = Some(reason.clone());
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
        if let Some(thinking) = chunk.thinking.as_ref().filter(|t| !t.is_empty()) {
            self.thinking
                .get_or_insert_with(String::new)
                .push_str(thinking);
        }

        self.content.push_str(&chunk.content);
        if chunk.has_tool_calls() {
            let current = std::mem::take(&mut self.tool_calls);
            self.tool_calls = crate::merge::merge_tool_calls(current, &chunk.tool_calls);
        }
        self.chunks.push(chunk);
    }
}

fn fill_once(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
            *slot = Some(v.clone());
        }
    }
}
