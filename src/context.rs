//! Cooperative cancellation and deadlines for a request.
//!
//! A [`Context`] travels with a [`Request`](crate::Request). The default retry
//! policy checks it before anything else, and the dispatch loop races both the
//! transport call and the backoff sleep against it.

use crate::Error;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cancellation signal and optional deadline attached to a request.
///
/// Cloning a context is cheap; all clones observe the same cancellation.
///
/// # Examples
///
/// ```
/// use reattempt::Context;
///
/// let (ctx, handle) = Context::background().with_cancel();
/// assert!(ctx.err().is_none());
///
/// handle.cancel();
/// assert!(ctx.err().unwrap().is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels the [`Context`] it was created with.
///
/// Dropping the handle without calling [`cancel`](CancelHandle::cancel) leaves the
/// context running.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels the context and every clone of it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a cancellable copy of this context and the handle that cancels it.
    ///
    /// A cancellation signal already attached to `self` is replaced.
    pub fn with_cancel(self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            deadline: self.deadline,
        };
        (ctx, CancelHandle { tx })
    }

    /// Returns a copy of this context that ends `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a copy of this context that ends at `deadline`.
    ///
    /// An earlier deadline already set on `self` is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// The deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context ended, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<Error> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Waits until the context ends and returns why.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> Error {
        tokio::select! {
            biased;
            () = self.cancelled() => Error::Cancelled,
            () = self.deadline_elapsed() => Error::DeadlineExceeded,
        }
    }

    async fn cancelled(&self) {
        if let Some(rx) = &self.cancel {
            let mut rx = rx.clone();
            // Err means the handle was dropped without cancelling.
            if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }

    async fn deadline_elapsed(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        assert!(Context::background().err().is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_seen_by_clones() {
        let (ctx, handle) = Context::background().with_cancel();
        let clone = ctx.clone();

        handle.cancel();

        assert!(matches!(clone.err(), Some(Error::Cancelled)));
        assert!(matches!(ctx.done().await, Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        assert!(ctx.err().is_none());

        assert!(matches!(ctx.done().await, Error::DeadlineExceeded));
        assert!(matches!(ctx.err(), Some(Error::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_deadline_wins() {
        let early = Instant::now() + Duration::from_secs(1);
        let ctx = Context::background()
            .with_deadline(early)
            .with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(early));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_never_cancels() {
        let (ctx, handle) = Context::background().with_cancel();
        drop(handle);

        let finished = tokio::time::timeout(Duration::from_secs(1), ctx.done()).await;
        assert!(finished.is_err());
        assert!(ctx.err().is_none());
    }
}
