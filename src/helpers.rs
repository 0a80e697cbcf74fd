//! One-call conveniences over [`StreamProcessor`].

use crate::error::StreamError;
use crate::parser::StreamFormat;
use crate::processor::StreamProcessor;
use crate::types::Chunk;
use futures_util::StreamExt;
use tokio::io::AsyncRead;

/// Read the whole stream and return the concatenated content.
pub async fn collect_content<R>(reader: R, format: StreamFormat) -> Result<String, StreamError>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let processor = StreamProcessor::new(reader, format);
    let response = processor.collect().await?;
    Ok(response.content)
}

/// Feed every chunk to `handler` in order.
///
/// A handler failure closes the engine and is returned as-is. Otherwise the
/// first pending decode error is returned, then any transport or
/// cancellation error.
pub async fn process_stream<R, F, E>(
    reader: R,
    format: StreamFormat,
    mut handler: F,
) -> Result<(), E>
where
    R: AsyncRead + Send + Unpin + 'static,
    F: FnMut(&Chunk) -> Result<(), E>,
    E: From<StreamError>,
{
    let processor = StreamProcessor::new(reader, format);
    let mut errors = processor.errors()?;
    let mut chunks = processor.chunks()?;

    while let Some(chunk) = chunks.next().await {
        if let Err(e) = handler(&chunk) {
            tracing::debug!("chunk handler failed, closing stream");
            processor.close()?;
            return Err(e);
        }
    }

    if let Some(error) = errors.try_recv() {
        return Err(error.into());
    }
    match processor.terminal_error() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
