//! # Reattempt - a retrying, multi-target HTTP client
//!
//! Reattempt wraps `reqwest` with automatic retries, backoff between attempts and
//! rotation across several equivalent endpoints. A request names its targets as
//! one space separated string; every attempt goes to whichever target the
//! scheduler picks next.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reattempt::{Client, Request};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reattempt::Error> {
//!     // Without any setup, through the shared default client
//!     let targets = "http://10.0.0.1:8500/v1/status http://10.0.0.2:8500/v1/status";
//!     let response = reattempt::get(targets).await?;
//!     println!("{}", response.status());
//!
//!     // With explicit configuration
//!     let client = Client::builder()
//!         .retry_wait_min(Duration::from_millis(100))
//!         .retry_wait_max(Duration::from_secs(5))
//!         .retry_max(3)
//!         .build()?;
//!
//!     let response = client
//!         .put(
//!             "http://10.0.0.1:8500/v1/kv/foo http://10.0.0.2:8500/v1/kv/foo",
//!             "text/plain",
//!             "bar",
//!         )
//!         .await?;
//!     println!("stored after {} attempts", response.attempts());
//!     Ok(())
//! }
//! ```
//!
//! ## When requests are retried
//!
//! The default [`RetryPolicy`] retries connection errors and 5xx responses
//! other than 501. Every other response is handed back to the caller untouched,
//! 4xx included. A cancelled [`Context`] always wins and is never retried.
//! When all `retry_max + 1` attempts are used, the client returns
//! [`Error::GaveUp`], whose message contains `giving up`.
//!
//! ## Request bodies
//!
//! Bodies are replayed on every attempt, so they are captured once when the
//! [`Request`] is built: byte vectors and strings are kept in memory, readers
//! are read fully up front, seekable streams are rewound before each attempt,
//! and [`Body::producer`] factories are called once per attempt.
//!
//! ## Hooks
//!
//! [`RetryPolicy`], [`Backoff`], [`Scheduler`] and [`Logger`] are traits; the
//! defaults are [`DefaultRetryPolicy`], [`ExponentialBackoff`], [`RoundRobin`]
//! and [`TracingLogger`]. Install replacements through [`ClientBuilder`].

pub mod body;
mod client;
mod context;
mod error;
mod logger;
mod request;
mod response;
pub mod retry;
pub mod retry_after;
mod scheduler;

pub use body::Body;
pub use client::{
    Client, ClientBuilder, DEFAULT_RETRY_MAX, DEFAULT_RETRY_WAIT_MAX, DEFAULT_RETRY_WAIT_MIN,
    RESPONSE_DRAIN_LIMIT,
};
pub use context::{CancelHandle, Context};
pub use error::{Error, Result};
pub use logger::{Logger, Severity, TracingLogger};
pub use request::Request;
pub use response::Response;
pub use retry::{
    Backoff, DefaultRetryPolicy, ExponentialBackoff, LinearJitterBackoff, RetryDecision,
    RetryPolicy,
};
pub use retry_after::RetryAfterBackoff;
pub use scheduler::{RoundRobin, Scheduler};

use std::sync::OnceLock;

static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();

/// The process-wide client used by the free functions of this crate.
///
/// Built with default settings on first use and never modified afterwards.
pub fn default_client() -> &'static Client {
    DEFAULT_CLIENT.get_or_init(Client::new)
}

/// Sends a GET request through the [`default_client`].
pub async fn get(targets: &str) -> Result<Response> {
    default_client().get(targets).await
}

/// Sends a HEAD request through the [`default_client`].
pub async fn head(targets: &str) -> Result<Response> {
    default_client().head(targets).await
}

/// Sends a POST request through the [`default_client`].
pub async fn post(targets: &str, content_type: &str, body: impl Into<Body>) -> Result<Response> {
    default_client().post(targets, content_type, body).await
}

/// Sends a PUT request through the [`default_client`].
pub async fn put(targets: &str, content_type: &str, body: impl Into<Body>) -> Result<Response> {
    default_client().put(targets, content_type, body).await
}

/// Sends a PATCH request through the [`default_client`].
pub async fn patch(targets: &str, content_type: &str, body: impl Into<Body>) -> Result<Response> {
    default_client().patch(targets, content_type, body).await
}

/// Sends a DELETE request through the [`default_client`].
pub async fn delete(targets: &str, content_type: &str, body: impl Into<Body>) -> Result<Response> {
    default_client().delete(targets, content_type, body).await
}

/// POSTs a form through the [`default_client`].
pub async fn post_form<K, V>(targets: &str, form: &[(K, V)]) -> Result<Response>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    default_client().post_form(targets, form).await
}
