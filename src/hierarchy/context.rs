use std::future::Future;
use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

use super::error::StoreError;

/// Per-request execution context handed to every store call.
///
/// Carries the request's cancellation token and the timeout each individual
/// store call is bounded by. Cloning shares the same token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    store_timeout: Duration,
}

impl RequestContext {
    pub fn new(store_timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            store_timeout,
        }
    }

    /// Context whose cancellation follows `parent`.
    pub fn child_of(parent: &CancellationToken, store_timeout: Duration) -> Self {
        Self {
            cancel: parent.child_token(),
            store_timeout,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the context when the returned guard is dropped, e.g. when the
    /// handler future is dropped because the client went away.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    /// Fail fast if the request has already been cancelled.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }

    /// Run one store call, bounded by cancellation and the per-call timeout.
    pub async fn run<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            res = tokio::time::timeout(self.store_timeout, call) => match res {
                Ok(inner) => inner,
                Err(_) => Err(StoreError::Timeout(self.store_timeout)),
            },
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
