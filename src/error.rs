//! Error types for retrying HTTP calls.
//!
//! Every failure the client can surface is a variant of [`Error`]. Construction
//! problems (bad targets, unsupported bodies) are reported before any network
//! traffic happens; transport failures are retried by the default policy and only
//! surface once the loop stops; [`Error::GaveUp`] is synthesized by the loop itself
//! when every attempt has been used.

use http::{Method, StatusCode};

/// The main error type for retrying HTTP calls.
///
/// # Examples
///
/// ```no_run
/// use reattempt::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new();
///
/// match client.get("http://primary.internal http://replica.internal").await {
///     Ok(response) => println!("status {}", response.status()),
///     Err(e) if e.is_gave_up() => eprintln!("every target kept failing: {e}"),
///     Err(Error::Cancelled) => eprintln!("caller went away"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    ///
    /// This wraps the underlying `reqwest::Error`. The default retry policy retries
    /// these, so callers only see one when the policy stops on it.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// One of the whitespace separated targets is not a valid absolute URL.
    #[error("Invalid target URL {target:?}: {source}")]
    InvalidUrl {
        /// The offending target as written by the caller.
        target: String,
        /// The parse failure.
        source: url::ParseError,
    },

    /// The target string did not contain a single target.
    #[error("No target URLs were provided")]
    NoTargets,

    /// The HTTP method could not be parsed.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request body is of a type the body materializer cannot replay.
    ///
    /// Carries the concrete type name of the rejected value.
    #[error("Cannot handle body of type {0}")]
    InvalidBodyType(String),

    /// The request body could not be produced.
    ///
    /// Raised at construction when the body producer fails on its first call or a
    /// reader cannot be drained, and during dispatch when the body cannot be
    /// reproduced for an attempt. Never retried.
    #[error("Failed to produce request body: {0}")]
    Body(#[source] std::io::Error),

    /// Failed to serialize a JSON request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Invalid configuration was provided, such as an invalid header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A retry policy stopped the loop and supplied its own error.
    #[error("Retry policy aborted the request: {0}")]
    Policy(Box<dyn std::error::Error + Send + Sync>),

    /// Every attempt was used without the retry policy deciding to stop.
    ///
    /// The display text always contains `giving up`.
    #[error("{method} {url} giving up after {attempts} attempts")]
    GaveUp {
        /// The request method.
        method: Method,
        /// The URL of the last attempt.
        url: String,
        /// Total number of attempts made (retry maximum plus one).
        attempts: usize,
    },

    /// The request context was cancelled.
    #[error("context canceled")]
    Cancelled,

    /// The request context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Failed to deserialize the response body into the expected type.
    ///
    /// Preserves the raw response text and the serde error message.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },
}

impl Error {
    /// Wraps an arbitrary error or message as a [`Error::Policy`] override.
    ///
    /// ```
    /// use reattempt::Error;
    ///
    /// let err = Error::policy("quota exhausted");
    /// assert_eq!(err.to_string(), "Retry policy aborted the request: quota exhausted");
    /// ```
    pub fn policy(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Policy(err.into())
    }

    /// Returns `true` if this error is a transient failure worth retrying.
    ///
    /// Only network errors qualify. Construction errors, cancellation, policy
    /// overrides and exhaustion are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::InvalidUrl { .. }
            | Error::NoTargets
            | Error::InvalidMethod(_)
            | Error::InvalidBodyType(_)
            | Error::Body(_)
            | Error::SerializationFailed(_)
            | Error::ConfigurationError(_)
            | Error::Policy(_)
            | Error::GaveUp { .. }
            | Error::Cancelled
            | Error::DeadlineExceeded
            | Error::DeserializationFailed { .. } => false,
        }
    }

    /// Returns `true` if the loop exhausted its attempts.
    pub fn is_gave_up(&self) -> bool {
        matches!(self, Error::GaveUp { .. })
    }

    /// Returns `true` if the request context was cancelled or timed out.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Network(e) => e.status(),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A specialized `Result` type for retrying HTTP calls.
pub type Result<T> = std::result::Result<T, Error>;
