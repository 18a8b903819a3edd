//! HTTP client with retries, backoff and multi-target scheduling.
//!
//! The [`Client`] type is the main entry point for making requests.
//! Use [`ClientBuilder`] to swap in custom policies or bounds.

use crate::{
    body::Body,
    logger::{Logger, Severity, TracingLogger},
    retry::{Backoff, DefaultRetryPolicy, ExponentialBackoff, RetryDecision, RetryPolicy},
    scheduler::{RoundRobin, Scheduler},
    Error, Request, Response, Result,
};
use http::{header::CONTENT_TYPE, HeaderValue, Method};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Default minimum wait between attempts.
pub const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_secs(1);

/// Default maximum wait between attempts.
pub const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_secs(30);

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_MAX: usize = 10;

/// How much of a discarded response body is read so the connection can be reused.
pub const RESPONSE_DRAIN_LIMIT: usize = 4096;

/// An HTTP client that retries transient failures across several targets.
///
/// The client is designed to be reused across many requests. It holds a pooled
/// `reqwest::Client` and the retry configuration, and is cheap to clone.
/// Configuration is fixed once the client is built.
///
/// # Examples
///
/// ```no_run
/// use reattempt::{Client, Request};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), reattempt::Error> {
/// let client = Client::builder()
///     .retry_wait_min(Duration::from_millis(100))
///     .retry_wait_max(Duration::from_secs(5))
///     .retry_max(4)
///     .build()?;
///
/// // Simple verbs
/// let response = client.get("http://10.0.0.1:8080/health http://10.0.0.2:8080/health").await?;
/// println!("healthy: {}", response.status());
///
/// // Full control over the request
/// let targets = "http://10.0.0.1:8080/v1/foo http://10.0.0.2:8080/v1/foo";
/// let request = Request::new("PUT", targets, "hello")?
///     .header("X-Request-Id", "42")?;
/// let response = client.execute(request).await?;
/// println!("stored after {} attempts", response.attempts());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    retry_wait_min: Duration,
    retry_wait_max: Duration,
    retry_max: usize,
    first_target: usize,
    check_for_retry: Arc<dyn RetryPolicy>,
    backoff: Arc<dyn Backoff>,
    scheduler: Arc<dyn Scheduler>,
    logger: Arc<dyn Logger>,
}

impl Client {
    /// Creates a client with the default configuration.
    ///
    /// Waits between 1s and 30s with exponential backoff, retries up to 10
    /// times, rotates targets round-robin and logs through `tracing`.
    pub fn new() -> Self {
        Self::from_parts(ClientBuilder::new(), reqwest::Client::new())
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    fn from_parts(builder: ClientBuilder, http_client: reqwest::Client) -> Self {
        Client {
            inner: Arc::new(ClientInner {
                http_client,
                retry_wait_min: builder.retry_wait_min,
                retry_wait_max: builder.retry_wait_max,
                retry_max: builder.retry_max,
                first_target: builder.first_target,
                check_for_retry: builder
                    .check_for_retry
                    .unwrap_or_else(|| Arc::new(DefaultRetryPolicy)),
                backoff: builder
                    .backoff
                    .unwrap_or_else(|| Arc::new(ExponentialBackoff)),
                scheduler: builder.scheduler.unwrap_or_else(|| Arc::new(RoundRobin)),
                logger: builder.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
            }),
        }
    }

    /// The minimum wait passed to the backoff.
    pub fn retry_wait_min(&self) -> Duration {
        self.inner.retry_wait_min
    }

    /// The maximum wait passed to the backoff.
    pub fn retry_wait_max(&self) -> Duration {
        self.inner.retry_wait_max
    }

    /// The number of retries after the first attempt.
    pub fn retry_max(&self) -> usize {
        self.inner.retry_max
    }

    /// Sends a request, retrying until the retry policy stops or attempts run out.
    ///
    /// Every attempt replays the body from the start, asks the scheduler for a
    /// target, and sends. The retry policy then decides: stopping returns the
    /// attempt's outcome (or the policy's own error) immediately; retrying
    /// drains the response, sleeps per the backoff, and loops. At most
    /// `retry_max + 1` attempts are made.
    ///
    /// # Errors
    ///
    /// - [`Error::GaveUp`] when every attempt was retried.
    /// - [`Error::Body`] when the body cannot be replayed; never retried.
    /// - Any error from the scheduler.
    /// - The transport error or policy override of the final attempt.
    /// - [`Error::Cancelled`] or [`Error::DeadlineExceeded`] when the request
    ///   context ends while waiting to retry.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let inner = &*self.inner;
        let ctx = request.context.clone();
        let start_time = Instant::now();
        let mut cursor = inner.first_target;

        for attempt in 0..=inner.retry_max {
            // Always rewind the request body when there is one.
            let body = match &request.body {
                Some(producer) => Some(producer.replay().map_err(Error::Body)?),
                None => None,
            };

            let (target, next) = inner.scheduler.next(&request.targets, cursor)?;
            cursor = next;
            match Url::parse(target) {
                Ok(url) => request.url = url,
                Err(source) => {
                    let err = Error::InvalidUrl {
                        target: target.to_string(),
                        source,
                    };
                    let msg = format!(
                        "scheduler picked unusable target {target}, reusing {}: ",
                        request.url
                    );
                    inner.logger.log(Some(&request), Severity::Error, &msg, Some(&err));
                }
            }

            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt = attempt + 1,
                "Executing HTTP request"
            );

            let outcome = tokio::select! {
                biased;
                err = ctx.done() => Err(err),
                result = inner.http_client.execute(build_attempt(&request, body)) => {
                    result.map_err(Error::from)
                }
            };

            if let Err(err) = &outcome {
                let msg = format!("{} {} request failed: ", request.method, request.url);
                inner.logger.log(Some(&request), Severity::Error, &msg, Some(err));
            }
            let status = outcome.as_ref().ok().map(|r| r.status());

            let decision = inner.check_for_retry.check(
                &ctx,
                outcome.as_ref().ok(),
                outcome.as_ref().err(),
            );
            match decision {
                RetryDecision::Retry => {}
                RetryDecision::Stop => {
                    let response = outcome?;
                    let latency = start_time.elapsed();
                    tracing::info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt + 1,
                        "Received HTTP response"
                    );
                    return Ok(Response::new(response, attempt + 1, latency));
                }
                RetryDecision::Fail(err) => return Err(err),
            }

            let remaining = inner.retry_max - attempt;
            let wait = (remaining > 0).then(|| {
                inner.backoff.delay(
                    inner.retry_wait_min,
                    inner.retry_wait_max,
                    attempt,
                    outcome.as_ref().ok(),
                )
            });

            if let Ok(response) = outcome {
                self.drain_body(response).await;
            }

            let Some(wait) = wait else {
                break;
            };

            let mut desc = format!("{} {}", request.method, request.url);
            if let Some(status) = status {
                desc = format!("{desc} status: {}", status.as_u16());
            }
            let msg = format!("{desc}: retrying in {wait:?} ({remaining} left)");
            inner.logger.log(Some(&request), Severity::Debug, &msg, None);

            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                () = tokio::time::sleep(wait) => {}
            }
        }

        Err(Error::GaveUp {
            method: request.method.clone(),
            url: request.url.to_string(),
            attempts: inner.retry_max + 1,
        })
    }

    /// Reads and discards the body so the connection can go back to the pool.
    ///
    /// Stops once [`RESPONSE_DRAIN_LIMIT`] bytes have been read. Bodies arrive in
    /// whole chunks, so the last chunk read may carry the total past the limit.
    /// Returns the number of bytes read.
    async fn drain_body(&self, mut response: reqwest::Response) -> usize {
        let mut drained = 0;
        while drained < RESPONSE_DRAIN_LIMIT {
            match response.chunk().await {
                Ok(Some(chunk)) => drained += chunk.len(),
                Ok(None) => break,
                Err(e) => {
                    let err = Error::from(e);
                    self.inner.logger.log(
                        None,
                        Severity::Error,
                        "error reading response body: ",
                        Some(&err),
                    );
                    break;
                }
            }
        }
        drained
    }

    /// Sends a GET request to `targets`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> Result<(), reattempt::Error> {
    /// let client = reattempt::Client::new();
    /// let response = client.get("http://10.0.0.1/foo/bar http://10.0.0.2/foo/bar").await?;
    /// println!("{}", response.text().await?);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, targets: &str) -> Result<Response> {
        let request = Request::new(Method::GET, targets, ())?;
        self.execute(request).await
    }

    /// Sends a HEAD request to `targets`.
    pub async fn head(&self, targets: &str) -> Result<Response> {
        let request = Request::new(Method::HEAD, targets, ())?;
        self.execute(request).await
    }

    /// Sends a POST request with the given content type and body.
    pub async fn post(
        &self,
        targets: &str,
        content_type: &str,
        body: impl Into<Body>,
    ) -> Result<Response> {
        self.send_with_body(Method::POST, targets, content_type, body.into())
            .await
    }

    /// Sends a PUT request with the given content type and body.
    pub async fn put(
        &self,
        targets: &str,
        content_type: &str,
        body: impl Into<Body>,
    ) -> Result<Response> {
        self.send_with_body(Method::PUT, targets, content_type, body.into())
            .await
    }

    /// Sends a PATCH request with the given content type and body.
    pub async fn patch(
        &self,
        targets: &str,
        content_type: &str,
        body: impl Into<Body>,
    ) -> Result<Response> {
        self.send_with_body(Method::PATCH, targets, content_type, body.into())
            .await
    }

    /// Sends a DELETE request with the given content type and body.
    pub async fn delete(
        &self,
        targets: &str,
        content_type: &str,
        body: impl Into<Body>,
    ) -> Result<Response> {
        self.send_with_body(Method::DELETE, targets, content_type, body.into())
            .await
    }

    /// POSTs `form` as `application/x-www-form-urlencoded`.
    ///
    /// ```no_run
    /// # async fn example() -> Result<(), reattempt::Error> {
    /// let client = reattempt::Client::new();
    /// client.post_form("http://10.0.0.1/login", &[("user", "ada"), ("pass", "hunter2")]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn post_form<K, V>(&self, targets: &str, form: &[(K, V)]) -> Result<Response>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.send_with_body(
            Method::POST,
            targets,
            "application/x-www-form-urlencoded",
            Body::form(form),
        )
        .await
    }

    async fn send_with_body(
        &self,
        method: Method,
        targets: &str,
        content_type: &str,
        body: Body,
    ) -> Result<Response> {
        let mut request = Request::new(method, targets, body)?;
        let content_type = HeaderValue::try_from(content_type)
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        request.headers_mut().insert(CONTENT_TYPE, content_type);
        self.execute(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the transport request for one attempt from the fixed parts of `request`.
fn build_attempt(request: &Request, body: Option<Vec<u8>>) -> reqwest::Request {
    let mut attempt = reqwest::Request::new(request.method.clone(), request.url.clone());
    *attempt.headers_mut() = request.headers.clone();
    *attempt.timeout_mut() = request.timeout;
    if let Some(body) = body {
        *attempt.body_mut() = Some(reqwest::Body::from(body));
    }
    attempt
}

/// Builder for configuring and creating a [`Client`].
///
/// Every setting has a default, so `ClientBuilder::new().build()` is equivalent
/// to [`Client::new`].
///
/// # Examples
///
/// ```no_run
/// use reattempt::{ClientBuilder, LinearJitterBackoff};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), reattempt::Error> {
/// let client = ClientBuilder::new()
///     .retry_wait_min(Duration::from_millis(800))
///     .retry_wait_max(Duration::from_millis(1200))
///     .retry_max(3)
///     .backoff(LinearJitterBackoff)
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    http_client: Option<reqwest::Client>,
    retry_wait_min: Duration,
    retry_wait_max: Duration,
    retry_max: usize,
    first_target: usize,
    timeout: Option<Duration>,
    check_for_retry: Option<Arc<dyn RetryPolicy>>,
    backoff: Option<Arc<dyn Backoff>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            http_client: None,
            retry_wait_min: DEFAULT_RETRY_WAIT_MIN,
            retry_wait_max: DEFAULT_RETRY_WAIT_MAX,
            retry_max: DEFAULT_RETRY_MAX,
            first_target: 0,
            timeout: None,
            check_for_retry: None,
            backoff: None,
            scheduler: None,
            logger: None,
        }
    }

    /// Uses an existing `reqwest::Client` as the transport.
    ///
    /// Overrides [`timeout`](ClientBuilder::timeout).
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Sets the minimum wait passed to the backoff.
    pub fn retry_wait_min(mut self, wait: Duration) -> Self {
        self.retry_wait_min = wait;
        self
    }

    /// Sets the maximum wait passed to the backoff.
    pub fn retry_wait_max(mut self, wait: Duration) -> Self {
        self.retry_wait_max = wait;
        self
    }

    /// Sets the number of retries after the first attempt.
    pub fn retry_max(mut self, retries: usize) -> Self {
        self.retry_max = retries;
        self
    }

    /// Sets the scheduler cursor each request starts from.
    pub fn first_target(mut self, cursor: usize) -> Self {
        self.first_target = cursor;
        self
    }

    /// Sets a timeout for each individual attempt on the built-in transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry policy. Defaults to [`DefaultRetryPolicy`].
    pub fn check_for_retry(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.check_for_retry = Some(Arc::new(policy));
        self
    }

    /// Sets the backoff. Defaults to [`ExponentialBackoff`].
    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Sets the scheduler. Defaults to [`RoundRobin`].
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Sets the logger. Defaults to [`TracingLogger`].
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be created.
    pub fn build(mut self) -> Result<Client> {
        let http_client = match self.http_client.take() {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?
            }
        };
        Ok(Client::from_parts(self, http_client))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
