use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of the chunk delivery queue
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Default termination sentinel
pub const DEFAULT_DONE_TOKEN: &str = "[DONE]";

/// Stream engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Capacity of the chunk delivery queue; the background task blocks once it is full
    pub buffer_size: usize,
    /// Whole-stream deadline in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Termination sentinel handed to parsers built from a `StreamFormat`
    pub done_token: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout_ms: None,
            done_token: DEFAULT_DONE_TOKEN.to_string(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delivery queue capacity (clamped to at least 1)
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Set the whole-stream deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set the termination sentinel
    pub fn with_done_token(mut self, token: impl Into<String>) -> Self {
        self.done_token = token.into();
        self
    }

    /// The whole-stream deadline, if one is set
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn effective_buffer_size(&self) -> usize {
        self.buffer_size.max(1)
    }
}
