//! The single background task that reads, decodes and fans out chunks.

use super::{Callbacks, LineSource, Shared, lock};
use crate::error::StreamError;
use crate::parser::FormatParser;
use crate::types::{Chunk, StreamResponse};
use crate::utils::cancel::CancelHandle;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

const DATA_PREFIX: &str = "data:";

/// Why the processing loop stopped
#[derive(Debug)]
pub(super) enum Termination {
    /// The byte source reached end of input
    Exhausted,
    /// The parser recognized a termination unit
    Done,
    /// The byte source failed
    Transport(StreamError),
    /// Cancellation token fired or the deadline elapsed
    Cancelled(StreamError),
}

impl Termination {
    fn into_error(self) -> Option<StreamError> {
        match self {
            Self::Exhausted | Self::Done => None,
            Self::Transport(e) | Self::Cancelled(e) => Some(e),
        }
    }
}

/// Raises the completion signal even if the task unwinds mid-stream.
///
/// An exit that skipped `finish` (a panicking parser or callback) is
/// recorded as a terminal error so it never reads as a clean end.
struct DoneOnDrop {
    shared: Arc<Shared>,
    tx: Option<watch::Sender<bool>>,
}

impl DoneOnDrop {
    fn new(shared: Arc<Shared>, tx: Option<watch::Sender<bool>>) -> Self {
        Self { shared, tx }
    }

    fn fire(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(true);
        }
    }
}

impl Drop for DoneOnDrop {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!("stream worker stopped before finishing");
            let mut state = lock(&self.shared.state);
            state.response.finished_at = Some(chrono::Utc::now());
            state.terminal_error.get_or_insert_with(|| {
                StreamError::TransportError("stream worker aborted unexpectedly".to_string())
            });
        }
        self.fire();
    }
}

pub(super) struct Worker {
    pub(super) shared: Arc<Shared>,
    pub(super) callbacks: Callbacks,
    pub(super) chunk_tx: Option<mpsc::Sender<Arc<Chunk>>>,
    pub(super) error_tx: Option<mpsc::Sender<StreamError>>,
    pub(super) done_tx: Option<watch::Sender<bool>>,
    pub(super) cancel: CancelHandle,
    pub(super) timeout_ms: Option<u64>,
}

impl Worker {
    pub(super) async fn run(mut self, source: LineSource) {
        let mut done = DoneOnDrop::new(Arc::clone(&self.shared), self.done_tx.take());
        self.mark_started();
        let deadline = self
            .timeout_ms
            .map(|ms| Instant::now() + std::time::Duration::from_millis(ms));
        let mut lines = source.lines();

        let reason = loop {
            if self.cancel.is_cancelled() {
                break Termination::Cancelled(cancelled_error());
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Termination::Cancelled(cancelled_error()),
                _ = deadline_elapsed(deadline) => break self.timed_out(),
                line = lines.next_line() => line,
            };

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => break Termination::Exhausted,
                Err(e) => break Termination::Transport(e.into()),
            };

            match self.handle_line(&line, deadline).await {
                Ok(false) => {}
                Ok(true) => break Termination::Done,
                Err(reason) => break reason,
            }
        };

        self.finish(reason);
        done.fire();
    }

    /// Finish without reading anything (the source was released before start).
    pub(super) fn finish_unstarted(mut self) {
        let mut done = DoneOnDrop::new(Arc::clone(&self.shared), self.done_tx.take());
        self.mark_started();
        self.finish(Termination::Cancelled(StreamError::Cancelled(
            "stream closed before it was started".to_string(),
        )));
        done.fire();
    }

    /// Process one raw line. Returns `Ok(true)` once the stream is done.
    async fn handle_line(
        &mut self,
        line: &str,
        deadline: Option<Instant>,
    ) -> Result<bool, Termination> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            tracing::trace!("ignoring non-data line: {}", line);
            return Ok(false);
        };
        let data = data.trim_start();
        tracing::debug!("stream unit: {}", data);

        let parser = self.shared.parser();
        match parser.parse(data) {
            Err(e) => {
                if parser.is_done(data) {
                    tracing::debug!("termination sentinel received");
                    return Ok(true);
                }
                tracing::warn!("failed to decode stream unit: {}", e);
                self.report(e);
                return Ok(false);
            }
            Ok(Some(chunk)) => {
                let chunk = Arc::new(chunk);
                lock(&self.shared.state).response.apply(Arc::clone(&chunk));
                if let Some(on_chunk) = &self.callbacks.on_chunk {
                    on_chunk(&chunk);
                }
                self.deliver(chunk, deadline).await?;
            }
            Ok(None) => {}
        }

        Ok(parser.is_done(data))
    }

    /// Push onto the bounded queue, giving up if cancellation wins the race.
    async fn deliver(
        &mut self,
        chunk: Arc<Chunk>,
        deadline: Option<Instant>,
    ) -> Result<(), Termination> {
        let Some(tx) = &self.chunk_tx else {
            return Ok(());
        };
        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Termination::Cancelled(cancelled_error())),
            _ = deadline_elapsed(deadline) => return Err(self.timed_out()),
            res = tx.send(chunk) => res.is_ok(),
        };
        if !sent {
            // Nobody is pulling anymore; keep aggregating without delivery.
            tracing::debug!("chunk receiver dropped");
            self.chunk_tx = None;
        }
        Ok(())
    }

    fn mark_started(&self) {
        lock(&self.shared.state).response.started_at = Some(chrono::Utc::now());
    }

    fn report(&self, error: StreamError) {
        if let Some(on_error) = &self.callbacks.on_error {
            on_error(&error);
        }
        if let Some(tx) = &self.error_tx {
            if tx.try_send(error).is_err() {
                tracing::trace!("error slot occupied, dropping error");
            }
        }
    }

    fn timed_out(&self) -> Termination {
        Termination::Cancelled(StreamError::Timeout(self.timeout_ms.unwrap_or_default()))
    }

    fn finish(&mut self, reason: Termination) {
        tracing::debug!("stream finished: {:?}", reason);
        let snapshot: StreamResponse = {
            let mut state = lock(&self.shared.state);
            state.response.finished_at = Some(chrono::Utc::now());
            if let Some(error) = reason.into_error() {
                state.terminal_error = Some(error);
            }
            state.response.clone()
        };
        if let Some(on_done) = &self.callbacks.on_done {
            on_done(&snapshot);
        }
        // Closing the queues lets every consumer observe the end.
        self.chunk_tx = None;
        self.error_tx = None;
    }
}

fn cancelled_error() -> StreamError {
    StreamError::Cancelled("stream context cancelled".to_string())
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
