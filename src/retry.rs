//! Retry policies and backoff strategies for handling transient failures.
//!
//! After every attempt the client asks its [`RetryPolicy`] whether to try again,
//! and before every retry it asks its [`Backoff`] how long to wait. Both are
//! traits so callers can swap in their own logic; the defaults reproduce the
//! common "retry connection errors and 5xx, back off exponentially" behaviour.

use crate::{Context, Error};
use rand::Rng;
use std::time::Duration;

/// What the dispatch loop should do after an attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Back off and try again, if attempts remain.
    Retry,
    /// Stop and hand the attempt's outcome (response or transport error) to the caller.
    Stop,
    /// Stop and return this error instead of the attempt's outcome.
    Fail(Error),
}

impl RetryDecision {
    /// Returns `true` for [`RetryDecision::Retry`].
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry)
    }
}

/// Decides whether an attempt should be retried.
///
/// Called once after every attempt with the request context and whichever of
/// the response or transport error the attempt produced.
///
/// # Examples
///
/// ```
/// use reattempt::{Context, Error, RetryDecision, RetryPolicy};
///
/// /// Only retries 503 Service Unavailable.
/// struct RetryOn503;
///
/// impl RetryPolicy for RetryOn503 {
///     fn check(
///         &self,
///         ctx: &Context,
///         response: Option<&reqwest::Response>,
///         _error: Option<&Error>,
///     ) -> RetryDecision {
///         if let Some(err) = ctx.err() {
///             return RetryDecision::Fail(err);
///         }
///         match response {
///             Some(r) if r.status().as_u16() == 503 => RetryDecision::Retry,
///             _ => RetryDecision::Stop,
///         }
///     }
/// }
/// ```
pub trait RetryPolicy: Send + Sync {
    /// Returns the decision for one attempt.
    fn check(
        &self,
        ctx: &Context,
        response: Option<&reqwest::Response>,
        error: Option<&Error>,
    ) -> RetryDecision;
}

/// Retries connection errors and server errors.
///
/// In order:
/// 1. A cancelled or expired context fails with the context error.
/// 2. Any transport error is retried.
/// 3. A missing response or a 5xx status other than 501 Not Implemented is retried.
/// 4. Everything else stops, and the response goes back to the caller as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryPolicy;

impl DefaultRetryPolicy {
    /// The decision for a bare status code, ignoring context and transport errors.
    pub fn decide_status(status: u16) -> RetryDecision {
        if status == 0 || ((500..=599).contains(&status) && status != 501) {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn check(
        &self,
        ctx: &Context,
        response: Option<&reqwest::Response>,
        error: Option<&Error>,
    ) -> RetryDecision {
        if let Some(err) = ctx.err() {
            return RetryDecision::Fail(err);
        }
        if error.is_some() {
            return RetryDecision::Retry;
        }
        match response {
            Some(response) => Self::decide_status(response.status().as_u16()),
            None => RetryDecision::Retry,
        }
    }
}

/// Computes how long to wait before the next attempt.
///
/// `attempt` is the zero based number of the attempt that just failed, and
/// `response` is its response, if it produced one.
pub trait Backoff: Send + Sync {
    /// Returns the delay before the next attempt.
    fn delay(
        &self,
        min: Duration,
        max: Duration,
        attempt: usize,
        response: Option<&reqwest::Response>,
    ) -> Duration;
}

/// Waits `min * 2^attempt`, capped at `max`.
///
/// ```
/// use reattempt::{Backoff, ExponentialBackoff};
/// use std::time::Duration;
///
/// let min = Duration::from_secs(1);
/// let max = Duration::from_secs(300);
/// assert_eq!(ExponentialBackoff.delay(min, max, 0, None), Duration::from_secs(1));
/// assert_eq!(ExponentialBackoff.delay(min, max, 3, None), Duration::from_secs(8));
/// assert_eq!(ExponentialBackoff.delay(min, max, 63, None), max);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialBackoff;

impl Backoff for ExponentialBackoff {
    fn delay(
        &self,
        min: Duration,
        max: Duration,
        attempt: usize,
        _response: Option<&reqwest::Response>,
    ) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let nanos = 2f64.powi(exponent) * min.as_nanos() as f64;
        // NaN and infinity both land here on overflow.
        if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
            return max;
        }
        Duration::from_nanos(nanos as u64)
    }
}

/// Linear backoff with jitter.
///
/// Each call picks a random base delay in `[min, max)` and multiplies it by
/// `attempt + 1`, so `min` and `max` bound the jitter rather than the result.
/// When `max <= min` the delay is exactly `min * (attempt + 1)`.
///
/// * `min == max == 1s` gives strictly linear delays: 1s, 2s, 3s, ...
/// * `800ms..1200ms` gives a little jitter around one second per attempt.
/// * `100ms..20s` gives extreme jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearJitterBackoff;

impl Backoff for LinearJitterBackoff {
    fn delay(
        &self,
        min: Duration,
        max: Duration,
        attempt: usize,
        _response: Option<&reqwest::Response>,
    ) -> Duration {
        let multiplier = u32::try_from(attempt.saturating_add(1)).unwrap_or(u32::MAX);
        if max <= min {
            return min.saturating_mul(multiplier);
        }
        let base = rand::thread_rng().gen_range(min..max);
        base.saturating_mul(multiplier)
    }
}
