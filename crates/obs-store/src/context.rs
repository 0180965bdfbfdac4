//! Deadlines and cancellation for store calls

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::port::StoreError;

/// Default bound on a single store call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request bounds applied to every store call
#[derive(Debug, Clone)]
pub struct RequestContext {
    timeout: Duration,
    cancelled: watch::Receiver<bool>,
}

/// Cancels the [`RequestContext`] it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Abort in-flight and future calls made under the context
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl RequestContext {
    /// Context that can time out but is never cancelled
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let (_, cancelled) = watch::channel(false);
        Self { timeout, cancelled }
    }

    /// Context plus a handle that cancels it
    #[must_use]
    pub fn cancellable(timeout: Duration) -> (Self, CancelHandle) {
        let (sender, cancelled) = watch::channel(false);
        (
            Self { timeout, cancelled },
            CancelHandle {
                sender: Arc::new(sender),
            },
        )
    }

    /// Deadline for each call
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the context has been cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Run a store call under this context's deadline and cancellation
    ///
    /// # Errors
    /// [`StoreError::Timeout`] if the deadline passes first,
    /// [`StoreError::Cancelled`] if the context is cancelled first, or the
    /// call's own error
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut cancelled = self.cancelled.clone();
        tokio::select! {
            outcome = tokio::time::timeout(self.timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(operation, timeout = ?self.timeout, "store call timed out");
                    Err(StoreError::Timeout { operation, after: self.timeout })
                }
            },
            () = wait_for_cancel(&mut cancelled) => {
                tracing::debug!(operation, "store call cancelled");
                Err(StoreError::Cancelled)
            }
        }
    }
}

async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // Sender gone: cancellation can no longer happen.
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
