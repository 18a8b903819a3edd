//! A request that can be sent to any one of several target URLs.
//!
//! The method, headers and body are fixed when the request is built. The URL
//! is not: the dispatch loop overwrites it on every attempt with whatever target
//! the [`Scheduler`](crate::Scheduler) picks.

use crate::body::{Body, BodyProducer};
use crate::{Context, Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::time::Duration;
use url::Url;

/// A retryable HTTP request and its candidate targets.
///
/// # Examples
///
/// ```
/// use reattempt::Request;
///
/// # fn example() -> Result<(), reattempt::Error> {
/// let targets = "http://10.0.0.1/v1/foo http://10.0.0.2/v1/foo";
/// let request = Request::new("PUT", targets, b"hello".to_vec())?
///     .header("X-Trace", "abc")?;
///
/// assert_eq!(request.targets().len(), 2);
/// assert_eq!(request.url().as_str(), "http://10.0.0.1/v1/foo");
/// assert_eq!(request.content_length(), Some(5));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) targets: Vec<String>,
    pub(crate) body: Option<BodyProducer>,
    pub(crate) content_length: Option<u64>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) context: Context,
}

impl Request {
    /// Builds a request for `method` against the space separated `targets`.
    ///
    /// The body is materialized immediately so it can be replayed on every attempt.
    ///
    /// # Errors
    ///
    /// Fails if the method is invalid, if any target is not a valid absolute URL,
    /// if there are no targets at all, or if the body cannot be materialized.
    pub fn new(method: impl AsRef<str>, targets: &str, body: impl Into<Body>) -> Result<Self> {
        let method = Method::from_bytes(method.as_ref().as_bytes())
            .map_err(|_| Error::InvalidMethod(method.as_ref().to_string()))?;
        let (body, content_length) = body.into().materialize()?;
        let (targets, url) = parse_targets(targets)?;

        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            targets,
            body,
            content_length,
            timeout: None,
            context: Context::background(),
        })
    }

    /// Wraps an already built `reqwest::Request`, keeping its method, headers,
    /// timeout and body, but sending it to `targets` instead of its own URL.
    ///
    /// # Errors
    ///
    /// Fails like [`Request::new`], and with [`Error::InvalidBodyType`] if the
    /// request carries a streaming body that cannot be replayed.
    pub fn from_request(request: reqwest::Request, targets: &str) -> Result<Self> {
        let body = match request.body() {
            None => Body::Empty,
            Some(body) => match body.as_bytes() {
                Some(bytes) => Body::Bytes(bytes.to_vec()),
                None => return Err(Error::InvalidBodyType("streaming reqwest::Body".to_string())),
            },
        };
        let (body, content_length) = body.materialize()?;
        let (targets, url) = parse_targets(targets)?;

        Ok(Self {
            method: request.method().clone(),
            url,
            headers: request.headers().clone(),
            targets,
            body,
            content_length,
            timeout: request.timeout().copied(),
            context: Context::background(),
        })
    }

    /// Adds a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets a timeout applied to each attempt individually.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a context; cancelling it stops the request between or during attempts.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URL of the current (or most recent) attempt.
    ///
    /// Before the first attempt this is the first target.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The candidate targets, in the order they were given.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The payload length, when it is known.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// The attached context.
    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Splits a target string on whitespace and validates every target.
///
/// Returns the targets and the parsed first one.
///
/// # Errors
///
/// Fails with [`Error::InvalidUrl`] on the first target that does not parse,
/// or [`Error::NoTargets`] if the string holds no targets.
pub(crate) fn parse_targets(targets: &str) -> Result<(Vec<String>, Url)> {
    let mut first = None;
    let mut list = Vec::new();
    for target in targets.split_whitespace() {
        let url = Url::parse(target).map_err(|source| Error::InvalidUrl {
            target: target.to_string(),
            source,
        })?;
        first.get_or_insert(url);
        list.push(target.to_string());
    }
    let first = first.ok_or(Error::NoTargets)?;
    Ok((list, first))
}
