//! Error Handling Module
//!
//! Errors produced while acquiring, decoding and delivering a streaming
//! response. Decode-class errors (`ParseError`, `ProviderError`) are
//! non-fatal and only reported; transport and cancellation errors end the
//! stream.
//!
//! # Example
//!
//! ```rust,ignore
//! use siumai_stream::error::StreamError;
//!
//! let error = StreamError::Cancelled("closed by caller".into());
//! assert!(error.is_cancellation());
//! assert!(error.is_fatal());
//! ```

use thiserror::Error;

/// Errors surfaced by the stream engine and its parsers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A wire unit did not match the shape the active parser expects.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The provider sent an error object inside the stream.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// The byte source failed for a reason other than normal exhaustion.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The owning cancellation token fired or `close()` was called.
    #[error("Stream cancelled: {0}")]
    Cancelled(String),

    /// The configured stream deadline elapsed.
    #[error("Stream timed out after {0}ms")]
    Timeout(u64),

    /// A single-consumer surface (chunk or error queue) was requested twice.
    #[error("{0} already consumed")]
    AlreadyConsumed(&'static str),

    /// Error raised by caller-supplied code in a convenience helper.
    #[error("Handler error: {0}")]
    HandlerError(String),
}

impl StreamError {
    /// Create a parse error from any displayable cause.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Wrap a failure raised by caller-supplied handler code.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        Self::HandlerError(err.to_string())
    }

    /// True for conditions caused by cancellation or deadline expiry.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::Timeout(_))
    }

    /// True for conditions that end the stream.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TransportError(_) | Self::Cancelled(_) | Self::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        Self::TransportError(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, StreamError>;
