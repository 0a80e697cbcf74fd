//! Utility modules for siumai-stream

pub mod cancel;
pub mod streaming;

pub use cancel::CancelHandle;
pub use streaming::{ChunkResultStream, SseEvent, SseStreamExt, parse_events};
