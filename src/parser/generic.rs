//! Path-driven parser for OpenAI-like or bespoke JSON streams

use super::json_path::get_string;
use super::{FormatParser, non_empty};
use crate::config::DEFAULT_DONE_TOKEN;
use crate::error::StreamError;
use crate::types::Chunk;
use serde::{Deserialize, Serialize};

/// Configurable parser that locates fields by JSON path.
///
/// ```rust,ignore
/// let parser = GenericParser::new("output.text")
///     .with_finish_reason_path("output.stop")
///     .with_done_token("<END>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericParser {
    pub content_path: String,
    pub done_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason_path: Option<String>,
}

impl GenericParser {
    pub fn new(content_path: impl Into<String>) -> Self {
        Self {
            content_path: content_path.into(),
            done_token: DEFAULT_DONE_TOKEN.to_string(),
            id_path: None,
            model_path: None,
            role_path: None,
            finish_reason_path: None,
        }
    }

    pub fn with_done_token(mut self, done_token: impl Into<String>) -> Self {
        self.done_token = done_token.into();
        self
    }

    pub fn with_id_path(mut self, path: impl Into<String>) -> Self {
        self.id_path = Some(path.into());
        self
    }

    pub fn with_model_path(mut self, path: impl Into<String>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn with_role_path(mut self, path: impl Into<String>) -> Self {
        self.role_path = Some(path.into());
        self
    }

    pub fn with_finish_reason_path(mut self, path: impl Into<String>) -> Self {
        self.finish_reason_path = Some(path.into());
        self
    }
}

impl FormatParser for GenericParser {
    fn parse(&self, data: &str) -> Result<Option<Chunk>, StreamError> {
        let value: serde_json::Value = serde_json::from_str(data)?;
        let lookup = |path: &Option<String>| {
            path.as_deref()
                .and_then(|p| non_empty(get_string(&value, p)))
        };

        Ok(Some(Chunk {
            id: lookup(&self.id_path),
            content: get_string(&value, &self.content_path).unwrap_or_default(),
            role: lookup(&self.role_path),
            model: lookup(&self.model_path),
            finish_reason: lookup(&self.finish_reason_path),
            raw: data.to_string(),
            ..Default::default()
        }))
    }

    fn is_done(&self, data: &str) -> bool {
        data.trim() == self.done_token
    }
}
