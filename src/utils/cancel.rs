//! Cancellation utilities
//!
//! Provides first-class cancellation handles for stream engines.

use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new, independent cancel handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Create a handle that is cancelled whenever `parent` is, but whose own
    /// cancellation does not propagate upward.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
        }
    }

    /// Request cancellation. The engine observing this handle stops at its
    /// next read or delivery point and drops the byte source.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// The underlying token, for composing with other cancellable work.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
