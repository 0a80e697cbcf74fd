//! Standalone SSE Event Reader
//!
//! Unlike the stream engine, which only looks at `data:` lines, this reader
//! uses eventsource-stream and therefore honors `event:`, `id:` and
//! `retry:` fields as well as multi-line `data:` payloads. It is useful when
//! a caller needs the full event framing or a plain stateless chunk stream
//! without the engine's aggregation.

use crate::error::StreamError;
use crate::parser::FormatParser;
use crate::types::Chunk;
use eventsource_stream::{EventStream, EventStreamError, Eventsource};
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

pub use eventsource_stream::Event as SseEvent;

/// Boxed stream of decoded chunks
pub type ChunkResultStream = Pin<Box<dyn Stream<Item = Result<Chunk, StreamError>> + Send>>;

/// Extension to turn a byte stream into SSE events
pub trait SseStreamExt: Sized {
    fn into_sse_stream(self) -> EventStream<Self>;
}

impl<S, B, E> SseStreamExt for S
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    fn into_sse_stream(self) -> EventStream<Self> {
        self.eventsource()
    }
}

fn convert_event_error<E: std::fmt::Display>(err: EventStreamError<E>) -> (StreamError, bool) {
    match err {
        EventStreamError::Transport(e) => (StreamError::TransportError(e.to_string()), true),
        other => (StreamError::parse(format!("SSE parsing error: {other}")), false),
    }
}

/// Decode an SSE byte stream into chunks with `parser`, without aggregation.
///
/// Decode errors are yielded and skipped, a transport error is yielded and
/// ends the stream, and the parser's termination unit ends it cleanly.
pub fn parse_events<S, B, E, P>(stream: S, parser: P) -> ChunkResultStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    P: FormatParser + 'static,
{
    let s = async_stream::stream! {
        let mut events = Box::pin(stream.into_sse_stream());
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    let (error, fatal) = convert_event_error(e);
                    yield Err(error);
                    if fatal {
                        break;
                    }
                    continue;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }

            match parser.parse(data) {
                Ok(Some(chunk)) => yield Ok(chunk),
                Ok(None) => {}
                Err(e) => {
                    if parser.is_done(data) {
                        break;
                    }
                    yield Err(e);
                    continue;
                }
            }
            if parser.is_done(data) {
                break;
            }
        }
    };
    Box::pin(s)
}
