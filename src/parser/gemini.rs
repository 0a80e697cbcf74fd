//! Gemini `streamGenerateContent` parser

use super::{FormatParser, non_empty};
use crate::error::StreamError;
use crate::types::{Chunk, Usage};
use serde::Deserialize;

/// Gemini stream response structure
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    model_version: Option<String>,
    response_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
    index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
    role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

impl From<GeminiUsageMetadata> for Usage {
    fn from(meta: GeminiUsageMetadata) -> Self {
        let prompt_tokens = meta.prompt_token_count.unwrap_or(0);
        let completion_tokens = meta.candidates_token_count.unwrap_or(0);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: meta
                .total_token_count
                .unwrap_or(prompt_tokens.saturating_add(completion_tokens)),
        }
    }
}

/// Parser for Gemini-style responses.
///
/// Only the first candidate is inspected; the text of all its parts is
/// joined. A non-empty `finishReason` both populates the chunk and ends the
/// stream.
#[derive(Debug, Clone, Default)]
pub struct GeminiParser;

impl GeminiParser {
    pub fn new() -> Self {
        Self
    }

    fn decode(data: &str) -> Result<GeminiStreamResponse, StreamError> {
        serde_json::from_str(data)
            .map_err(|e| StreamError::parse(format!("Failed to parse Gemini response: {e}")))
    }
}

impl FormatParser for GeminiParser {
    fn parse(&self, data: &str) -> Result<Option<Chunk>, StreamError> {
        let response = Self::decode(data)?;

        let mut chunk = Chunk {
            id: non_empty(response.response_id),
            model: non_empty(response.model_version),
            usage: response.usage_metadata.map(Usage::from),
            raw: data.to_string(),
            ..Default::default()
        };

        if let Some(candidate) = response.candidates.into_iter().next() {
            chunk.index = candidate.index.unwrap_or(0);
            chunk.finish_reason = non_empty(candidate.finish_reason);
            if let Some(content) = candidate.content {
                chunk.role = non_empty(content.role);
                chunk.content = content.parts.into_iter().filter_map(|p| p.text).collect();
            }
        }

        Ok(Some(chunk))
    }

    fn is_done(&self, data: &str) -> bool {
        Self::decode(data)
            .ok()
            .and_then(|r| r.candidates.into_iter().next())
            .and_then(|c| c.finish_reason)
            .is_some_and(|reason| !reason.is_empty())
    }
}
