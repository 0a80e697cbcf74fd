//! Stream engine
//!
//! [`StreamProcessor`] owns a line-oriented byte source, the active
//! [`FormatParser`], one background task and three consumption surfaces:
//!
//! - iteration via [`StreamProcessor::chunks`]
//! - callbacks via [`StreamProcessor::on_chunk`], [`StreamProcessor::on_done`]
//!   and [`StreamProcessor::on_error`]
//! - blocking aggregation via [`StreamProcessor::collect`]
//!
//! The background task is the only writer of the aggregate
//! [`StreamResponse`]; every other call site reads it under the same lock.
//!
//! ```rust,ignore
//! use siumai_stream::{StreamFormat, StreamProcessor};
//!
//! let processor = StreamProcessor::new(reader, StreamFormat::OpenAi);
//! processor.on_chunk(|chunk| print!("{}", chunk.content));
//! let response = processor.collect().await?;
//! println!("\nfinish: {:?}", response.finish_reason);
//! ```

mod streams;
mod worker;

pub use streams::{ChunkStream, ErrorStream};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::parser::{FormatParser, StreamFormat};
use crate::types::{Chunk, StreamResponse};
use crate::utils::cancel::CancelHandle;
use futures_util::TryStreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncBufRead, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use worker::Worker;

/// Per-chunk handler
pub type ChunkCallback = Arc<dyn Fn(&Chunk) + Send + Sync>;
/// Completion handler, receives the final aggregate
pub type DoneCallback = Arc<dyn Fn(&StreamResponse) + Send + Sync>;
/// Handler for non-fatal decode errors
pub type ErrorCallback = Arc<dyn Fn(&StreamError) + Send + Sync>;

type LineSource = Box<dyn AsyncBufRead + Send + Unpin>;

#[derive(Clone, Default)]
struct Callbacks {
    on_chunk: Option<ChunkCallback>,
    on_done: Option<DoneCallback>,
    on_error: Option<ErrorCallback>,
}

#[derive(Default)]
struct State {
    response: StreamResponse,
    terminal_error: Option<StreamError>,
}

struct Shared {
    state: Mutex<State>,
    parser: Mutex<Arc<dyn FormatParser>>,
}

impl Shared {
    fn parser(&self) -> Arc<dyn FormatParser> {
        Arc::clone(&lock(&self.parser))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Queues {
    chunk_tx: Option<mpsc::Sender<Arc<Chunk>>>,
    chunk_rx: Option<mpsc::Receiver<Arc<Chunk>>>,
    error_tx: Option<mpsc::Sender<StreamError>>,
    error_rx: Option<mpsc::Receiver<StreamError>>,
}

impl Queues {
    fn new(buffer_size: usize) -> Self {
        let (chunk_tx, chunk_rx) = mpsc::channel(buffer_size);
        // Errors are diagnostic: one slot, drop on full.
        let (error_tx, error_rx) = mpsc::channel(1);
        Self {
            chunk_tx: Some(chunk_tx),
            chunk_rx: Some(chunk_rx),
            error_tx: Some(error_tx),
            error_rx: Some(error_rx),
        }
    }
}

/// Normalizing stream engine
///
/// Dropping the engine cancels the background task, so it must outlive any
/// [`ChunkStream`] or [`ErrorStream`] taken from it.
pub struct StreamProcessor {
    shared: Arc<Shared>,
    source: Mutex<Option<LineSource>>,
    format: Option<StreamFormat>,
    config: StreamConfig,
    callbacks: Mutex<Callbacks>,
    queues: Mutex<Queues>,
    cancel: CancelHandle,
    started: AtomicBool,
    closed: AtomicBool,
    done_tx: Mutex<Option<watch::Sender<bool>>>,
    done_rx: watch::Receiver<bool>,
}

impl StreamProcessor {
    /// Create an engine over `reader` decoding the given vendor format.
    pub fn new<R>(reader: R, format: StreamFormat) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let config = StreamConfig::default();
        let parser = format.parser_with_config(&config);
        let mut processor = Self::build(Box::new(BufReader::new(reader)), parser, config);
        processor.format = Some(format);
        processor
    }

    /// Create an engine over `reader` with a caller-supplied parser.
    pub fn with_parser<R, P>(reader: R, parser: P) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        P: FormatParser + 'static,
    {
        Self::build(
            Box::new(BufReader::new(reader)),
            Arc::new(parser),
            StreamConfig::default(),
        )
    }

    /// Create an engine over a stream of byte buffers, such as an HTTP
    /// response body.
    pub fn from_byte_stream<S, B, E>(stream: S, format: StreamFormat) -> Self
    where
        S: futures::Stream<Item = Result<B, E>> + Send + 'static,
        B: bytes::Buf + Send + Unpin + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let reader = tokio_util::io::StreamReader::new(Box::pin(
            stream.map_err(std::io::Error::other),
        ));
        Self::new(reader, format)
    }

    fn build(source: LineSource, parser: Arc<dyn FormatParser>, config: StreamConfig) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                parser: Mutex::new(parser),
            }),
            source: Mutex::new(Some(source)),
            format: None,
            queues: Mutex::new(Queues::new(config.effective_buffer_size())),
            config,
            callbacks: Mutex::new(Callbacks::default()),
            cancel: CancelHandle::new(),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
        }
    }

    /// Apply a configuration. Must be called before the engine starts.
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        *self.queues.get_mut().unwrap_or_else(PoisonError::into_inner) =
            Queues::new(config.effective_buffer_size());
        if let Some(format) = self.format {
            *lock(&self.shared.parser) = format.parser_with_config(&config);
        }
        self.config = config;
        self
    }

    /// Tie the engine to an owning token: cancelling `parent` ends the
    /// stream, while `close()` only affects this engine.
    pub fn with_cancellation(mut self, parent: &CancellationToken) -> Self {
        self.cancel = CancelHandle::child_of(parent);
        self
    }

    /// Replace the active parser. Takes effect from the next wire unit.
    pub fn set_parser<P>(&self, parser: P)
    where
        P: FormatParser + 'static,
    {
        *lock(&self.shared.parser) = Arc::new(parser);
    }

    /// Register the per-chunk handler. Must be called before `start`.
    pub fn on_chunk<F>(&self, f: F) -> &Self
    where
        F: Fn(&Chunk) + Send + Sync + 'static,
    {
        self.register("on_chunk", |cbs| cbs.on_chunk = Some(Arc::new(f)));
        self
    }

    /// Register the completion handler. Must be called before `start`.
    pub fn on_done<F>(&self, f: F) -> &Self
    where
        F: Fn(&StreamResponse) + Send + Sync + 'static,
    {
        self.register("on_done", |cbs| cbs.on_done = Some(Arc::new(f)));
        self
    }

    /// Register the decode-error handler. Must be called before `start`.
    pub fn on_error<F>(&self, f: F) -> &Self
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        self.register("on_error", |cbs| cbs.on_error = Some(Arc::new(f)));
        self
    }

    fn register(&self, name: &str, apply: impl FnOnce(&mut Callbacks)) {
        // `start` flips the flag under this lock.
        let mut callbacks = lock(&self.callbacks);
        if self.is_started() {
            tracing::warn!("{} registered after start; it will not be invoked", name);
            return;
        }
        apply(&mut callbacks);
    }

    /// Launch the background task. Idempotent and non-blocking; requires a
    /// Tokio runtime.
    pub fn start(&self) {
        let callbacks = {
            let callbacks = lock(&self.callbacks);
            if self.started.swap(true, Ordering::SeqCst) {
                return;
            }
            callbacks.clone()
        };

        let (chunk_tx, error_tx) = {
            let mut queues = lock(&self.queues);
            (queues.chunk_tx.take(), queues.error_tx.take())
        };
        let worker = Worker {
            shared: Arc::clone(&self.shared),
            callbacks,
            chunk_tx,
            error_tx,
            done_tx: lock(&self.done_tx).take(),
            cancel: self.cancel.clone(),
            timeout_ms: self.config.timeout_ms,
        };

        let source = lock(&self.source).take();
        match source {
            Some(source) => {
                tracing::debug!("starting stream processor");
                tokio::spawn(worker.run(source));
            }
            None => worker.finish_unstarted(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether the engine has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// Take the chunk queue for pull-based reading, starting the engine.
    ///
    /// The queue has a single consumer; a second call fails with
    /// [`StreamError::AlreadyConsumed`].
    pub fn chunks(&self) -> Result<ChunkStream, StreamError> {
        let rx = lock(&self.queues)
            .chunk_rx
            .take()
            .ok_or(StreamError::AlreadyConsumed("chunk stream"))?;
        self.start();
        Ok(ChunkStream::new(rx))
    }

    /// Take the best-effort decode-error queue. Does not start the engine.
    pub fn errors(&self) -> Result<ErrorStream, StreamError> {
        lock(&self.queues)
            .error_rx
            .take()
            .map(ErrorStream::new)
            .ok_or(StreamError::AlreadyConsumed("error stream"))
    }

    /// Snapshot of the aggregate so far. Valid at any point of the stream.
    pub fn response(&self) -> StreamResponse {
        lock(&self.shared.state).response.clone()
    }

    /// The transport or cancellation error that ended the stream, if any.
    pub fn terminal_error(&self) -> Option<StreamError> {
        lock(&self.shared.state).terminal_error.clone()
    }

    /// A handle that cancels only this engine.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the terminal state and return the aggregate.
    ///
    /// Starts the engine if needed. If no one has taken the chunk queue it
    /// is drained here so the background task cannot stall on a full queue.
    pub async fn wait_result(&self) -> StreamResponse {
        self.start();
        let chunk_rx = lock(&self.queues).chunk_rx.take();
        self.drain(chunk_rx, None).await;
        self.wait_done().await;
        self.response()
    }

    /// Run to completion and return the aggregate.
    ///
    /// On a transport or cancellation error the error is returned; the
    /// partial aggregate remains available through [`Self::response`].
    pub async fn collect(&self) -> Result<StreamResponse, StreamError> {
        self.start();
        let (chunk_rx, error_rx) = {
            let mut queues = lock(&self.queues);
            (queues.chunk_rx.take(), queues.error_rx.take())
        };
        self.drain(chunk_rx, error_rx).await;
        self.wait_done().await;

        let state = lock(&self.shared.state);
        match &state.terminal_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.response.clone()),
        }
    }

    /// Discard delivered chunks and errors until the chunk queue closes or
    /// this engine is cancelled. Chunks were applied before delivery.
    async fn drain(
        &self,
        mut chunk_rx: Option<mpsc::Receiver<Arc<Chunk>>>,
        mut error_rx: Option<mpsc::Receiver<StreamError>>,
    ) {
        let Some(chunks) = chunk_rx.as_mut() else {
            return;
        };
        let mut errors_open = error_rx.is_some();
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                chunk = chunks.recv() => {
                    if chunk.is_none() {
                        break;
                    }
                }
                error = recv_or_pending(&mut error_rx), if errors_open => match error {
                    Some(e) => tracing::debug!("decode error while collecting: {}", e),
                    None => errors_open = false,
                },
            }
        }
    }

    async fn wait_done(&self) {
        let mut done = self.done_rx.clone();
        // The sender always fires before it is dropped.
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Cancel the stream and release the byte source. Idempotent.
    pub fn close(&self) -> Result<(), StreamError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("closing stream processor");
        self.cancel.cancel();
        // Not started yet: the source is still ours to drop.
        drop(lock(&self.source).take());
        Ok(())
    }
}

impl Drop for StreamProcessor {
    /// Dropping the engine cancels its task and releases the byte source.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for StreamProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProcessor")
            .field("format", &self.format)
            .field("config", &self.config)
            .field("started", &self.is_started())
            .field("finished", &self.is_finished())
            .finish()
    }
}

async fn recv_or_pending<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
