//! One-call helper tests over fixtures

use crate::support;
use siumai_stream::{StreamError, StreamFormat, collect_content, process_stream};

#[tokio::test]
async fn collect_content_from_each_vendor() {
    let cases = [
        ("tests/fixtures/anthropic/message_start_deltas_stop.sse", StreamFormat::Claude, "Hello world"),
        ("tests/fixtures/gemini/text_then_stop.sse", StreamFormat::Gemini, "The sky is blue."),
        ("tests/fixtures/openai/reasoning_content.sse", StreamFormat::OpenAi, "4"),
    ];
    for (path, format, expected) in cases {
        let reader = support::fixture_reader(path).expect("load fixture");
        let content = collect_content(reader, format).await.expect("stream ok");
        assert_eq!(content, expected, "fixture {path}");
    }
}

#[tokio::test]
async fn process_stream_surfaces_provider_error() {
    let reader = support::fixture_reader("tests/fixtures/anthropic/overloaded_error.sse")
        .expect("load fixture");
    let mut text = String::new();
    let result = process_stream(reader, StreamFormat::Claude, |chunk| {
        text.push_str(&chunk.content);
        Ok::<(), StreamError>(())
    })
    .await;

    assert_eq!(text, "Partial");
    assert!(matches!(result, Err(StreamError::ProviderError(_))));
}

#[tokio::test]
async fn handler_abort_stops_iteration() {
    let reader = support::fixture_reader("tests/fixtures/gemini/text_then_stop.sse")
        .expect("load fixture");
    let mut calls = 0;
    let result = process_stream(reader, StreamFormat::Gemini, |_| {
        calls += 1;
        Err(StreamError::handler("disk full"))
    })
    .await;

    assert_eq!(calls, 1);
    assert_eq!(result, Err(StreamError::HandlerError("disk full".to_string())));
}

#[tokio::test]
async fn format_names_resolve() {
    let format: StreamFormat = "anthropic".parse().expect("known alias");
    assert_eq!(format, StreamFormat::Claude);
    assert!("carrier-pigeon".parse::<StreamFormat>().is_err());
}
