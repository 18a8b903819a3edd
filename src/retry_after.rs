//! Backoff that honours the server's `Retry-After` header.
//!
//! A 503 from an overloaded endpoint often says how long to stay away. The
//! [`RetryAfterBackoff`] wrapper waits that long (capped at the client's maximum
//! wait) and falls back to another [`Backoff`] when the header is absent.

use crate::retry::{Backoff, ExponentialBackoff};
use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// Wraps another backoff, preferring the `Retry-After` header of the last response.
///
/// # Examples
///
/// ```no_run
/// use reattempt::{Client, LinearJitterBackoff, RetryAfterBackoff};
///
/// # fn example() -> Result<(), reattempt::Error> {
/// let client = Client::builder()
///     .backoff(RetryAfterBackoff::new(LinearJitterBackoff))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryAfterBackoff<B = ExponentialBackoff> {
    fallback: B,
}

impl<B: Backoff> RetryAfterBackoff<B> {
    /// Creates a wrapper delegating to `fallback` when there is no usable header.
    pub fn new(fallback: B) -> Self {
        Self { fallback }
    }
}

impl<B: Backoff> Backoff for RetryAfterBackoff<B> {
    fn delay(
        &self,
        min: Duration,
        max: Duration,
        attempt: usize,
        response: Option<&reqwest::Response>,
    ) -> Duration {
        match response.and_then(|r| parse_retry_after(r.headers())) {
            Some(wait) => wait.min(max),
            None => self.fallback.delay(min, max, attempt, response),
        }
    }
}

/// Parses the Retry-After header.
///
/// Supports both delay-seconds (integer) and HTTP-date formats. A date in the
/// past means no wait.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;

    if let Ok(seconds) = header.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date_time = httpdate::parse_http_date(header).ok()?;
    Some(
        date_time
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO),
    )
}
