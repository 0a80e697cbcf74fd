//! Test fixture utilities: load `.sse` captures and drive the parsers

use futures_util::StreamExt;
use siumai_stream::{Chunk, FormatParser, StreamError};
use std::io::{self, Cursor};

/// Read a fixture whole, as the engine's byte source
pub fn fixture_reader(path: &str) -> io::Result<Cursor<Vec<u8>>> {
    std::fs::read(path).map(Cursor::new)
}

/// Load an `.sse` fixture file and split it into SSE events (separated by blank lines), returning a byte stream
pub fn load_sse_fixture_as_bytes(path: &str) -> io::Result<Vec<Result<Vec<u8>, io::Error>>> {
    let raw = std::fs::read_to_string(path)?;
    // Normalize line endings
    let normalized = raw.replace("\r\n", "\n");
    let mut out = Vec::new();
    for event in normalized.split("\n\n") {
        let s = event.trim_end_matches('\n');
        if s.is_empty() {
            continue;
        }
        // Restore SSE event blank line terminator
        let mut owned = String::from(s);
        owned.push_str("\n\n");
        out.push(Ok(owned.into_bytes()));
    }
    Ok(out)
}

/// Decode a byte stream with `parser` through the standalone SSE reader
pub async fn collect_parsed<P>(
    bytes: Vec<Result<Vec<u8>, io::Error>>,
    parser: P,
) -> Vec<Result<Chunk, StreamError>>
where
    P: FormatParser + 'static,
{
    let byte_stream = futures_util::stream::iter(bytes);
    siumai_stream::parse_events(byte_stream, parser)
        .collect()
        .await
}
