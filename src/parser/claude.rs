//! Anthropic Messages API event parser

use super::{FormatParser, non_empty};
use crate::error::StreamError;
use crate::types::{Chunk, Usage};
use serde::Deserialize;

/// Anthropic stream event structure
#[derive(Debug, Clone, Deserialize)]
struct ClaudeStreamEvent {
    r#type: String,
    #[serde(default)]
    message: Option<ClaudeMessage>,
    #[serde(default)]
    delta: Option<ClaudeDelta>,
    #[serde(default)]
    usage: Option<ClaudeUsage>,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    error: Option<ClaudeError>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeMessage {
    id: Option<String>,
    model: Option<String>,
    role: Option<String>,
    usage: Option<ClaudeUsage>,
}

/// Supports text_delta, thinking_delta and the message-level delta
#[derive(Debug, Clone, Deserialize)]
struct ClaudeDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl From<ClaudeUsage> for Usage {
    fn from(usage: ClaudeUsage) -> Self {
        Usage::new(
            usage.input_tokens.unwrap_or(0),
            usage.output_tokens.unwrap_or(0),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeError {
    r#type: Option<String>,
    message: Option<String>,
}

/// Only the tag is needed to detect termination
#[derive(Deserialize)]
struct ClaudeEventTag {
    r#type: String,
}

/// Parser for Anthropic-style events tagged by `type`.
///
/// `message_start` carries identity, `content_block_delta` carries text,
/// `message_delta` carries the stop reason and `message_stop` ends the
/// stream.
#[derive(Debug, Clone, Default)]
pub struct ClaudeParser;

impl ClaudeParser {
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for ClaudeParser {
    fn parse(&self, data: &str) -> Result<Option<Chunk>, StreamError> {
        let event: ClaudeStreamEvent = serde_json::from_str(data)
            .map_err(|e| StreamError::parse(format!("Failed to parse Anthropic event: {e}")))?;

        let mut chunk = Chunk::from_raw(data);
        chunk.index = event.index.unwrap_or(0);

        match event.r#type.as_str() {
            "message_start" => {
                let Some(message) = event.message else {
                    return Ok(None);
                };
                chunk.id = non_empty(message.id);
                chunk.role = non_empty(message.role);
                chunk.model = non_empty(message.model);
                chunk.usage = message.usage.map(Usage::from);
                Ok(Some(chunk))
            }
            "content_block_delta" => {
                let Some(delta) = event.delta else {
                    return Ok(None);
                };
                if delta.text.is_none() && delta.thinking.is_none() {
                    // input_json_delta and friends carry no text
                    return Ok(None);
                }
                chunk.content = delta.text.unwrap_or_default();
                chunk.thinking = non_empty(delta.thinking);
                Ok(Some(chunk))
            }
            "message_delta" => {
                chunk.finish_reason = event.delta.and_then(|d| non_empty(d.stop_reason));
                chunk.usage = event.usage.map(Usage::from);
                Ok(Some(chunk))
            }
            "error" => {
                let (kind, message) = event
                    .error
                    .map(|e| (e.r#type, e.message))
                    .unwrap_or_default();
                Err(StreamError::ProviderError(format!(
                    "{}: {}",
                    kind.unwrap_or_else(|| "error".to_string()),
                    message.unwrap_or_else(|| "Unknown error".to_string())
                )))
            }
            // message_stop, ping, content_block_start/stop
            _ => Ok(None),
        }
    }

    fn is_done(&self, data: &str) -> bool {
        serde_json::from_str::<ClaudeEventTag>(data)
            .map(|tag| tag.r#type == "message_stop")
            .unwrap_or(false)
    }
}
