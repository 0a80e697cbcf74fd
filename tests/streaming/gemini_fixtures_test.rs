//! Gemini streaming fixtures tests

use crate::support;
use siumai_stream::{GeminiParser, StreamFormat, StreamProcessor, Usage};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const TEXT_THEN_STOP: &str = "tests/fixtures/gemini/text_then_stop.sse";

#[tokio::test]
async fn gemini_finish_reason_ends_stream() {
    let reader = support::fixture_reader(TEXT_THEN_STOP).expect("load fixture");
    let processor = StreamProcessor::new(reader, StreamFormat::Gemini);

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    processor.on_chunk(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let finished = Arc::new(AtomicUsize::new(0));
    let done_counter = Arc::clone(&finished);
    processor.on_done(move |response| {
        assert_eq!(response.content, "The sky is blue.");
        done_counter.fetch_add(1, Ordering::SeqCst);
    });

    let response = processor.collect().await.expect("stream ok");

    assert_eq!(response.content, "The sky is blue.");
    assert_eq!(response.id.as_deref(), Some("resp-9"));
    assert_eq!(response.model.as_deref(), Some("gemini-2.0-flash"));
    assert_eq!(response.role.as_deref(), Some("model"));
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(response.usage, Some(Usage::new(4, 5)));
    // The unit after STOP is never read.
    assert_eq!(delivered.load(Ordering::SeqCst), 3);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gemini_sse_reader_matches_engine() {
    let bytes = support::load_sse_fixture_as_bytes(TEXT_THEN_STOP).expect("load fixture");
    let chunks = support::collect_parsed(bytes, GeminiParser::new()).await;

    assert_eq!(chunks.len(), 3);
    let last = chunks.last().unwrap().as_ref().expect("chunk");
    assert_eq!(last.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(last.usage.map(|u| u.total_tokens), Some(9));
}
