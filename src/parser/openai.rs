//! OpenAI chat-completions chunk parser

use super::{FormatParser, non_empty};
use crate::config::DEFAULT_DONE_TOKEN;
use crate::error::StreamError;
use crate::types::{Chunk, ToolCall, Usage};
use serde::Deserialize;

/// OpenAI stream event structure
#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamEvent {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiStreamUsage>,
}

/// OpenAI stream choice
#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamChoice {
    index: Option<usize>,
    delta: Option<OpenAiStreamDelta>,
    finish_reason: Option<String>,
}

/// OpenAI stream delta
#[derive(Debug, Clone, Default)]
struct OpenAiStreamDelta {
    role: Option<String>,
    content: Option<String>,
    tool_calls: Vec<OpenAiToolCallDelta>,
    thinking: Option<String>,
}

impl<'de> Deserialize<'de> for OpenAiStreamDelta {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let tool_calls = match value.get("tool_calls") {
            Some(v) if !v.is_null() => {
                serde_json::from_value(v.clone()).map_err(serde::de::Error::custom)?
            }
            _ => Vec::new(),
        };

        Ok(Self {
            role: value.get("role").and_then(|v| v.as_str()).map(String::from),
            content: value
                .get("content")
                .and_then(|v| v.as_str())
                .map(String::from),
            tool_calls,
            thinking: extract_thinking(&value),
        })
    }
}

/// Reasoning text in priority order: reasoning_content > thinking > reasoning
fn extract_thinking(value: &serde_json::Value) -> Option<String> {
    ["reasoning_content", "thinking", "reasoning"]
        .iter()
        .find_map(|field| {
            value
                .get(field)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
}

/// OpenAI tool call delta
#[derive(Debug, Clone, Deserialize)]
struct OpenAiToolCallDelta {
    id: Option<String>,
    r#type: Option<String>,
    function: Option<OpenAiFunctionCallDelta>,
}

/// OpenAI function call delta
#[derive(Debug, Clone, Deserialize)]
struct OpenAiFunctionCallDelta {
    name: Option<String>,
    arguments: Option<String>,
}

impl From<OpenAiToolCallDelta> for ToolCall {
    fn from(delta: OpenAiToolCallDelta) -> Self {
        let (name, arguments) = delta
            .function
            .map(|f| (f.name, f.arguments))
            .unwrap_or_default();
        Self {
            id: delta.id.unwrap_or_default(),
            r#type: delta.r#type.unwrap_or_default(),
            name: name.unwrap_or_default(),
            arguments: arguments.unwrap_or_default(),
        }
    }
}

/// OpenAI usage information
#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl From<OpenAiStreamUsage> for Usage {
    fn from(usage: OpenAiStreamUsage) -> Self {
        let prompt_tokens = usage.prompt_tokens.unwrap_or(0);
        let completion_tokens = usage.completion_tokens.unwrap_or(0);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: usage
                .total_tokens
                .unwrap_or(prompt_tokens.saturating_add(completion_tokens)),
        }
    }
}

/// Parser for OpenAI-style `chat.completion.chunk` units.
///
/// Only the first choice is inspected. The stream ends with a literal
/// sentinel unit (`[DONE]` unless configured otherwise).
#[derive(Debug, Clone)]
pub struct OpenAiParser {
    done_token: String,
}

impl Default for OpenAiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiParser {
    pub fn new() -> Self {
        Self::with_done_token(DEFAULT_DONE_TOKEN)
    }

    pub fn with_done_token(done_token: impl Into<String>) -> Self {
        Self {
            done_token: done_token.into(),
        }
    }

    pub fn done_token(&self) -> &str {
        &self.done_token
    }
}

impl FormatParser for OpenAiParser {
    fn parse(&self, data: &str) -> Result<Option<Chunk>, StreamError> {
        let event: OpenAiStreamEvent = serde_json::from_str(data)
            .map_err(|e| StreamError::parse(format!("Failed to parse OpenAI event: {e}")))?;

        let mut chunk = Chunk {
            id: non_empty(event.id),
            model: non_empty(event.model),
            usage: event.usage.map(Usage::from),
            raw: data.to_string(),
            ..Default::default()
        };

        if let Some(choice) = event.choices.into_iter().next() {
            chunk.index = choice.index.unwrap_or(0);
            chunk.finish_reason = non_empty(choice.finish_reason);
            let delta = choice.delta.unwrap_or_default();
            chunk.role = non_empty(delta.role);
            chunk.content = delta.content.unwrap_or_default();
            chunk.thinking = delta.thinking;
            chunk.tool_calls = delta.tool_calls.into_iter().map(ToolCall::from).collect();
        }

        Ok(Some(chunk))
    }

    fn is_done(&self, data: &str) -> bool {
        data.trim() == self.done_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_chunk_metadata_and_content() {
        let parser = OpenAiParser::new();
        let data = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","model":"gpt-4o","choices":[{"index":0,"delta":{"role":"assistant","content":"Hello"},"finish_reason":null}]}"#;
        let chunk = parser.parse(data).unwrap().unwrap();
        assert_eq!(chunk.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(chunk.model.as_deref(), Some("gpt-4o"));
        assert_eq!(chunk.role.as_deref(), Some("assistant"));
        assert_eq!(chunk.content, "Hello");
        assert_eq!(chunk.finish_reason, None);
        assert_eq!(chunk.raw, data);
        assert!(!parser.is_done(data));
    }

    #[test]
    fn sentinel_fails_decode_but_is_done() {
        let parser = OpenAiParser::new();
        assert!(parser.parse("[DONE]").is_err());
        assert!(parser.is_done("[DONE]"));
        assert!(parser.is_done(" [DONE] "));
    }

    #[test]
    fn usage_total_saturates_instead_of_overflowing() {
        let parser = OpenAiParser::new();
        let chunk = parser
            .parse(r#"{"choices":[],"usage":{"prompt_tokens":4294967295,"completion_tokens":1}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.usage.map(|u| u.total_tokens), Some(u32::MAX));
    }

    #[test]
    fn maps_tool_call_deltas() {
        let parser = OpenAiParser::new();
        let data = r#"{"id":"c","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"get_weather","arguments":""}}]},"finish_reason":null}]}"#;
        let chunk = parser.parse(data).unwrap().unwrap();
        assert_eq!(chunk.tool_calls.len(), 1);
        assert_eq!(chunk.tool_calls[0].id, "call_1");
        assert_eq!(chunk.tool_calls[0].r#type, "function");
        assert_eq!(chunk.tool_calls[0].name, "get_weather");
        assert_eq!(chunk.tool_calls[0].arguments, "");
    }

    #[test]
    fn reads_finish_reason_and_trailing_usage() {
        let parser = OpenAiParser::new();
        let finish = parser
            .parse(r#"{"id":"c","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(finish.finish_reason.as_deref(), Some("stop"));
        assert!(finish.content.is_empty());

        let usage = parser
            .parse(r#"{"id":"c","choices":[],"usage":{"prompt_tokens":9,"completion_tokens":3,"total_tokens":12}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(usage.usage, Some(Usage::new(9, 3)));
    }

    #[test]
    fn reasoning_fields_follow_priority() {
        let parser = OpenAiParser::new();
        let chunk = parser
            .parse(r#"{"choices":[{"delta":{"reasoning":"low","reasoning_content":"high"}}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.thinking.as_deref(), Some("high"));
    }
}
