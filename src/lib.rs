//! # siumai-stream
//!
//! Turns the streaming responses of OpenAI-compatible, Anthropic and Gemini
//! endpoints into one normalized event model.
//!
//! A [`StreamProcessor`] reads newline-delimited `data:` units from any async
//! byte source, decodes each with a [`FormatParser`], merges the results into
//! a [`StreamResponse`] and fans each [`Chunk`] out to a pull-based stream
//! and to registered callbacks.
//!
//! ```rust,ignore
//! use siumai_stream::{StreamFormat, collect_content};
//!
//! let text = collect_content(body_reader, StreamFormat::Claude).await?;
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod helpers;
pub mod merge;
pub mod parser;
pub mod processor;
pub mod types;
pub mod utils;

pub use config::StreamConfig;
pub use error::{Result, StreamError};
pub use helpers::{collect_content, process_stream};
pub use merge::merge_tool_calls;
pub use parser::{
    ClaudeParser, FormatParser, GeminiParser, GenericParser, OpenAiParser, StreamFormat,
};
pub use processor::{ChunkStream, ErrorStream, StreamProcessor};
pub use types::{Chunk, StreamResponse, ToolCall, Usage};
pub use utils::cancel::CancelHandle;
pub use utils::streaming::parse_events;
