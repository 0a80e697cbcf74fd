//! Format parsers
//!
//! Each parser decodes one wire unit (the payload after the `data:` prefix)
//! into a vendor-neutral [`Chunk`] and decides whether a unit ends the
//! stream. Parsers are stateless, so they can be swapped at any time.

mod claude;
mod gemini;
mod generic;
mod json_path;
mod openai;

pub use claude::ClaudeParser;
pub use gemini::GeminiParser;
pub use generic::GenericParser;
pub use openai::OpenAiParser;

use crate::config::{DEFAULT_DONE_TOKEN, StreamConfig};
use crate::error::StreamError;
use crate::types::Chunk;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Decodes wire units of one vendor format.
pub trait FormatParser: Send + Sync {
    /// Decode one unit. `Ok(None)` means "nothing to deliver for this unit".
    fn parse(&self, data: &str) -> Result<Option<Chunk>, StreamError>;

    /// Whether this unit marks the end of the stream.
    fn is_done(&self, data: &str) -> bool;
}

impl<P: FormatParser + ?Sized> FormatParser for Arc<P> {
    fn parse(&self, data: &str) -> Result<Option<Chunk>, StreamError> {
        (**self).parse(data)
    }

    fn is_done(&self, data: &str) -> bool {
        (**self).is_done(data)
    }
}

/// Supported vendor wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// Chat completions chunks (`choices[].delta`)
    #[serde(alias = "openai-compatible")]
    OpenAi,
    /// Messages API events tagged by `type`
    #[serde(alias = "anthropic")]
    Claude,
    /// `streamGenerateContent` responses with `candidates`
    #[serde(alias = "google")]
    Gemini,
}

impl StreamFormat {
    /// Build the parser for this format with the default sentinel
    pub fn parser(self) -> Arc<dyn FormatParser> {
        self.parser_with_done_token(DEFAULT_DONE_TOKEN)
    }

    /// Build the parser for this format honoring the configured sentinel
    pub fn parser_with_config(self, config: &StreamConfig) -> Arc<dyn FormatParser> {
        self.parser_with_done_token(&config.done_token)
    }

    fn parser_with_done_token(self, done_token: &str) -> Arc<dyn FormatParser> {
        match self {
            Self::OpenAi => Arc::new(OpenAiParser::with_done_token(done_token)),
            Self::Claude => Arc::new(ClaudeParser::new()),
            Self::Gemini => Arc::new(GeminiParser::new()),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Claude),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(StreamError::parse(format!("Unknown stream format: {other}"))),
        }
    }
}

/// Treat `None` and `Some("")` alike.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_str_accepts_aliases() {
        assert_eq!("OpenAI".parse::<StreamFormat>().unwrap(), StreamFormat::OpenAi);
        assert_eq!("anthropic".parse::<StreamFormat>().unwrap(), StreamFormat::Claude);
        assert_eq!(" google ".parse::<StreamFormat>().unwrap(), StreamFormat::Gemini);
        assert!("cohere".parse::<StreamFormat>().is_err());
    }

    #[test]
    fn format_serde_round_trip() {
        let f: StreamFormat = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(f, StreamFormat::Claude);
        assert_eq!(serde_json::to_string(&StreamFormat::OpenAi).unwrap(), "\"openai\"");
    }

    #[test]
    fn configured_sentinel_reaches_openai_parser() {
        let cfg = StreamConfig::default().with_done_token("<EOS>");
        let parser = StreamFormat::OpenAi.parser_with_config(&cfg);
        assert!(parser.is_done("<EOS>"));
        assert!(!parser.is_done("[DONE]"));
    }
}
