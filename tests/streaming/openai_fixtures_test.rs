//! OpenAI streaming fixtures tests

use crate::support;
use siumai_stream::{OpenAiParser, StreamFormat, StreamProcessor, Usage};
use std::sync::{Arc, Mutex};

const TOOL_CALLS: &str = "tests/fixtures/openai/tool_call_fragments.sse";
const REASONING: &str = "tests/fixtures/openai/reasoning_content.sse";

#[tokio::test]
async fn openai_tool_call_fragments_are_merged() {
    let reader = support::fixture_reader(TOOL_CALLS).expect("load fixture");
    let processor = StreamProcessor::new(reader, StreamFormat::OpenAi);

    let response = processor.collect().await.expect("stream ok");

    assert_eq!(response.id.as_deref(), Some("chatcmpl-42"));
    assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(response.role.as_deref(), Some("assistant"));
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(response.content, "");
    assert_eq!(response.tool_calls.len(), 1);

    let call = &response.tool_calls[0];
    assert_eq!(call.id, "call_123");
    assert_eq!(call.r#type, "function");
    assert_eq!(call.name, "get_weather");
    assert_eq!(call.arguments, r#"{"location":"Beijing"}"#);

    let args = response
        .tool_call_arguments_json(0)
        .expect("tool call present")
        .expect("arguments are complete JSON");
    assert_eq!(args["location"], "Beijing");

    assert_eq!(response.usage, Some(Usage::new(18, 9)));
    assert_eq!(response.chunk_count(), 5);
    assert!(response.finished_at.is_some());
}

#[tokio::test]
async fn openai_reasoning_is_kept_apart_from_content() {
    let reader = support::fixture_reader(REASONING).expect("load fixture");
    let processor = StreamProcessor::new(reader, StreamFormat::OpenAi);

    let thinking_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&thinking_seen);
    processor.on_chunk(move |chunk| {
        if let Some(t) = &chunk.thinking {
            sink.lock().unwrap().push(t.clone());
        }
    });

    let response = processor.collect().await.expect("stream ok");
    assert_eq!(response.content, "4");
    assert_eq!(response.thinking.as_deref(), Some("Two plus two is four."));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(thinking_seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn openai_sse_reader_matches_engine() {
    let bytes = support::load_sse_fixture_as_bytes(TOOL_CALLS).expect("load fixture");
    let chunks = support::collect_parsed(bytes, OpenAiParser::new()).await;

    // Sentinel ends the stream without producing a chunk.
    assert_eq!(chunks.len(), 5);
    let arguments: String = chunks
        .iter()
        .map(|c| c.as_ref().expect("chunk"))
        .flat_map(|c| c.tool_calls.iter())
        .map(|call| call.arguments.as_str())
        .collect();
    assert_eq!(arguments, r#"{"location":"Beijing"}"#);
}
