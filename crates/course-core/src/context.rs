//! Per-request deadline and cancellation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a bounded call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// The call did not finish within its time budget.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// The request was cancelled before the call finished.
    #[error("request cancelled")]
    Cancelled,
}

/// Deadline and cancellation token carried explicitly through every call
/// made on behalf of a request.
///
/// Clones share the same cancellation token, so cancelling any clone
/// cancels them all.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use course_core::RequestContext;
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = RequestContext::with_timeout(Duration::from_secs(5));
/// let value = ctx.bound(Duration::from_secs(1), async { 7 }).await;
/// assert_eq!(value, Ok(7));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
    request_id: Option<String>,
}

impl RequestContext {
    /// A context with no deadline that is never cancelled unless asked to.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
            request_id: None,
        }
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context with an absolute deadline.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::background()
        }
    }

    /// Tags the context with the request id used in logs.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The time budget for one call limited to `limit`.
    pub fn budget(&self, limit: Duration) -> Duration {
        self.remaining().map_or(limit, |left| left.min(limit))
    }

    /// Runs `fut` for at most [`budget(limit)`](Self::budget), aborting
    /// early if the context is cancelled. The future is dropped when the
    /// call is interrupted, releasing whatever it held.
    pub async fn bound<F, T>(&self, limit: Duration, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }

        let budget = self.budget(limit);
        if budget.is_zero() {
            return Err(Interrupted::DeadlineExceeded(budget));
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            result = tokio::time::timeout(budget, fut) => {
                result.map_err(|_| Interrupted::DeadlineExceeded(budget))
            }
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}
