//! Anthropic streaming fixtures tests

use crate::support;
use futures_util::StreamExt;
use siumai_stream::{ClaudeParser, StreamError, StreamFormat, StreamProcessor, Usage};

#[tokio::test]
async fn anthropic_message_start_deltas_stop_fixture() {
    let reader = support::fixture_reader("tests/fixtures/anthropic/message_start_deltas_stop.sse")
        .expect("load fixture");
    let processor = StreamProcessor::new(reader, StreamFormat::Claude);

    let contents: Vec<String> = processor
        .chunks()
        .expect("chunk stream")
        .map(|chunk| chunk.content.clone())
        .collect()
        .await;
    // message_start and message_delta carry no text
    assert_eq!(contents, vec!["", "Hello", " world", ""]);

    let response = processor.wait_result().await;
    assert_eq!(response.id.as_deref(), Some("msg_01"));
    assert_eq!(response.model.as_deref(), Some("claude-3-5-sonnet-20241022"));
    assert_eq!(response.role.as_deref(), Some("assistant"));
    assert_eq!(response.content, "Hello world");
    assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.usage, Some(Usage::new(5, 7)));
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(12));
    assert!(processor.terminal_error().is_none());
}

#[tokio::test]
async fn anthropic_thinking_and_text_fixture() {
    let reader = support::fixture_reader("tests/fixtures/anthropic/thinking_and_text.sse")
        .expect("load fixture");
    let processor = StreamProcessor::new(reader, StreamFormat::Claude);

    let response = processor.collect().await.expect("stream ok");
    assert_eq!(response.thinking.as_deref(), Some("Let me think. Done."));
    assert_eq!(response.content, "Answer: 42");
    assert_eq!(response.usage.map(|u| u.completion_tokens), Some(20));
    assert_eq!(response.chunks.last().map(|c| c.index), Some(0));
}

#[tokio::test]
async fn anthropic_error_event_is_reported_but_not_fatal() {
    let reader = support::fixture_reader("tests/fixtures/anthropic/overloaded_error.sse")
        .expect("load fixture");
    let processor = StreamProcessor::new(reader, StreamFormat::Claude);
    let mut errors = processor.errors().expect("error stream");

    let response = processor.collect().await.expect("stream ok");
    assert_eq!(response.content, "Partial");
    assert_eq!(
        errors.recv().await,
        Some(StreamError::ProviderError(
            "overloaded_error: Overloaded".to_string()
        ))
    );
    assert_eq!(errors.recv().await, None);
}

#[tokio::test]
async fn anthropic_sse_reader_skips_control_events() {
    let bytes = support::load_sse_fixture_as_bytes(
        "tests/fixtures/anthropic/message_start_deltas_stop.sse",
    )
    .expect("load fixture");
    let chunks = support::collect_parsed(bytes, ClaudeParser::new()).await;

    let content: String = chunks
        .into_iter()
        .map(|c| c.expect("chunk").content)
        .collect();
    assert_eq!(content, "Hello world");
}
