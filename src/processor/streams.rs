//! Pull-based consumption surfaces backed by the engine's queues.

use crate::error::StreamError;
use crate::types::Chunk;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Chunks in delivery order. Ends when the engine reaches a terminal state.
#[derive(Debug)]
pub struct ChunkStream {
    rx: mpsc::Receiver<Arc<Chunk>>,
}

impl ChunkStream {
    pub(crate) fn new(rx: mpsc::Receiver<Arc<Chunk>>) -> Self {
        Self { rx }
    }

    /// Receive the next chunk, or `None` once the queue is closed.
    pub async fn recv(&mut self) -> Option<Arc<Chunk>> {
        self.rx.recv().await
    }
}

impl futures::Stream for ChunkStream {
    type Item = Arc<Chunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Best-effort stream of non-fatal decode errors.
///
/// Backed by a single slot: errors raised while the slot is occupied are
/// dropped.
#[derive(Debug)]
pub struct ErrorStream {
    rx: mpsc::Receiver<StreamError>,
}

impl ErrorStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamError>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<StreamError> {
        self.rx.recv().await
    }

    /// Take the pending error, if one is waiting, without blocking.
    pub fn try_recv(&mut self) -> Option<StreamError> {
        self.rx.try_recv().ok()
    }
}

impl futures::Stream for ErrorStream {
    type Item = StreamError;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
