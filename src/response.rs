//! Response wrapper that records how the response was obtained.
//!
//! The [`Response`] type wraps the `reqwest::Response` of the attempt that ended
//! the retry loop, together with how many attempts it took and how long the whole
//! exchange lasted.

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// The final response of a retried request.
///
/// Whatever status the server returned is passed through: a 404 is a response,
/// not an error. Only the retry policy turns outcomes into errors.
///
/// # Examples
///
/// ```no_run
/// use reattempt::Client;
///
/// # async fn example() -> Result<(), reattempt::Error> {
/// let client = Client::new();
/// let response = client.get("http://a.internal/health http://b.internal/health").await?;
///
/// println!("{} from {}", response.status(), response.url());
/// println!("took {:?} over {} attempts", response.latency(), response.attempts());
///
/// if response.was_retried() {
///     println!("body: {}", response.text().await?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
    attempts: usize,
    latency: Duration,
}

impl Response {
    /// Wraps a transport response.
    ///
    /// This is typically called internally by the client when the retry loop stops.
    pub fn new(inner: reqwest::Response, attempts: usize, latency: Duration) -> Self {
        Self {
            inner,
            attempts,
            latency,
        }
    }

    /// The HTTP status code of the response.
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns a header value by name, if present and valid UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reattempt::Response;
    /// # use std::time::Duration;
    /// let inner = http::Response::builder()
    ///     .header("content-type", "application/json")
    ///     .body("{}")
    ///     .unwrap();
    /// let response = Response::new(inner.into(), 1, Duration::from_millis(100));
    ///
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// The URL of the target that produced this response.
    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// The number of attempts made, including the one that produced this response.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// The total time from the first attempt until this response arrived,
    /// including backoff sleeps.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Returns `true` if the request required retries.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reattempt::Response;
    /// # use std::time::Duration;
    /// let inner = http::Response::new("");
    /// let response = Response::new(inner.into(), 3, Duration::from_millis(100));
    ///
    /// assert!(response.was_retried());
    /// ```
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Reads the body as text.
    pub async fn text(self) -> Result<String> {
        Ok(self.inner.text().await?)
    }

    /// Reads the body as raw bytes.
    pub async fn bytes(self) -> Result<Vec<u8>> {
        Ok(self.inner.bytes().await?.to_vec())
    }

    /// Reads the body and deserializes it as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] with the raw body if it is not
    /// valid JSON for `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let status = self.inner.status();
        let raw_body = self.inner.text().await?;

        serde_json::from_str(&raw_body).map_err(|e| {
            tracing::error!(
                error = %e,
                raw_response = %raw_body,
                "Failed to deserialize response"
            );
            Error::DeserializationFailed {
                serde_error: e.to_string(),
                raw_response: raw_body,
                status,
            }
        })
    }

    /// Returns the underlying `reqwest::Response`.
    pub fn into_inner(self) -> reqwest::Response {
        self.inner
    }
}

impl AsRef<reqwest::Response> for Response {
    fn as_ref(&self) -> &reqwest::Response {
        &self.inner
    }
}
