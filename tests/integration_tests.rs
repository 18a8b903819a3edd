//! Integration tests using wiremock to simulate HTTP servers.

use reattempt::{
    Body, Client, ClientBuilder, Context, DefaultRetryPolicy, Error, Logger, Request,
    RetryDecision, RetryPolicy, Scheduler, Severity,
};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A builder with waits short enough for tests.
fn fast_client() -> ClientBuilder {
    init_tracing();
    Client::builder()
        .retry_wait_min(Duration::from_millis(1))
        .retry_wait_max(Duration::from_millis(10))
}

/// Delegates to the default policy and counts invocations.
#[derive(Clone, Default)]
struct CountingPolicy {
    calls: Arc<AtomicUsize>,
}

impl RetryPolicy for CountingPolicy {
    fn check(
        &self,
        ctx: &Context,
        response: Option<&reqwest::Response>,
        error: Option<&Error>,
    ) -> RetryDecision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DefaultRetryPolicy.check(ctx, response, error)
    }
}

#[derive(Clone, Default)]
struct RecordingLogger {
    entries: Arc<Mutex<Vec<(Severity, String)>>>,
    /// Messages logged without a request.
    detached: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl Logger for RecordingLogger {
    fn log(
        &self,
        request: Option<&Request>,
        severity: Severity,
        message: &str,
        error: Option<&Error>,
    ) {
        let error = error.map(|e| e.to_string()).unwrap_or_default();
        let entry = (severity, format!("{message}{error}"));
        match request {
            Some(_) => self.entries.lock().unwrap().push(entry),
            None => self.detached.lock().unwrap().push(entry),
        }
    }
}

/// Serves every connection with the same raw HTTP response, then closes it.
async fn serve_raw(response: &'static str) -> (String, Arc<AtomicUsize>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/foo/bar"), connections)
}

/// Answers 500 for the first `failures` requests and 200 afterwards.
fn flaky(
    failures: usize,
    hits: Arc<AtomicUsize>,
) -> impl Fn(&wiremock::Request) -> ResponseTemplate + Send + Sync + 'static {
    move |_req: &wiremock::Request| {
        let count = hits.fetch_add(1, Ordering::SeqCst);
        if count < failures {
            ResponseTemplate::new(500).set_body_string("Server error")
        } else {
            ResponseTemplate::new(200).set_body_string("ok")
        }
    }
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/foo/bar"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client().build().unwrap();
    let response = client
        .get(&format!("{}/foo/bar", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.attempts(), 1);
    assert!(!response.was_retried());
    assert_eq!(response.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn test_retry_on_5xx_then_succeed() {
    let mock_server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(flaky(3, hits.clone()))
        .mount(&mock_server)
        .await;

    let client = fast_client().retry_max(3).build().unwrap();
    let response = client
        .get(&format!("{}/test", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.attempts(), 4);
    assert!(response.was_retried());
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = fast_client().retry_max(2).build().unwrap();
    let request = Request::new("POST", &mock_server.uri(), ()).unwrap();
    let result = client.execute(request).await;

    match result {
        Err(err @ Error::GaveUp { .. }) => {
            assert!(err.to_string().contains("giving up"));
            if let Error::GaveUp { attempts, .. } = err {
                assert_eq!(attempts, 3);
            }
        }
        other => panic!("Expected GaveUp, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gives_up_when_unreachable() {
    let logger = RecordingLogger::default();
    let client = fast_client()
        .retry_max(2)
        .logger(logger.clone())
        .build()
        .unwrap();
    let result = client.get("http://127.0.0.1:1/foo/bar").await;

    match result {
        Err(Error::GaveUp { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("Expected GaveUp, got {:?}", other),
    }

    let entries = logger.entries.lock().unwrap();
    let failures = entries
        .iter()
        .filter(|(severity, msg)| *severity == Severity::Error && msg.contains("request failed"))
        .count();
    assert_eq!(failures, 3, "{entries:?}");
    let retries = entries
        .iter()
        .filter(|(severity, _)| *severity == Severity::Debug)
        .count();
    assert_eq!(retries, 2, "{entries:?}");
}

#[tokio::test]
async fn test_large_retried_body_is_drained() {
    let mock_server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    Mock::given(method("GET"))
        .respond_with(move |_req: &wiremock::Request| {
            if hits_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(500).set_body_bytes(vec![b'x'; 256 * 1024])
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .mount(&mock_server)
        .await;

    let logger = RecordingLogger::default();
    let client = fast_client().logger(logger.clone()).build().unwrap();
    let response = client.get(&mock_server.uri()).await.unwrap();

    assert_eq!(response.attempts(), 3);
    assert_eq!(response.text().await.unwrap(), "ok");
    assert!(logger.detached.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_drain_failure_is_logged_without_request() {
    // Promises more body than it sends, so reading the body fails.
    let (url, connections) = serve_raw(
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100000\r\n\r\ntruncated",
    )
    .await;

    let logger = RecordingLogger::default();
    let client = fast_client()
        .retry_max(1)
        .logger(logger.clone())
        .build()
        .unwrap();
    let result = client.get(&url).await;

    match result {
        Err(Error::GaveUp { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("Expected GaveUp, got {:?}", other),
    }
    assert_eq!(connections.load(Ordering::SeqCst), 2);

    let detached = logger.detached.lock().unwrap();
    assert_eq!(detached.len(), 2, "{detached:?}");
    for (severity, message) in detached.iter() {
        assert_eq!(*severity, Severity::Error);
        assert!(message.contains("error reading response body"), "{message}");
    }
}

#[tokio::test]
async fn test_client_errors_are_returned_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client().build().unwrap();
    let response = client.get(&mock_server.uri()).await.unwrap();

    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.attempts(), 1);
    assert_eq!(response.text().await.unwrap(), "Not found");
}

#[tokio::test]
async fn test_not_implemented_is_permanent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(501))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client().build().unwrap();
    let response = client.get(&mock_server.uri()).await.unwrap();
    assert_eq!(response.status().as_u16(), 501);
}

#[tokio::test]
async fn test_round_robin_across_targets() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut servers = Vec::new();

    for label in ["A", "B", "C"] {
        let server = MockServer::start().await;
        let order = order.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| {
                order.lock().unwrap().push(label);
                ResponseTemplate::new(500)
            })
            .mount(&server)
            .await;
        servers.push(server);
    }

    let targets = servers
        .iter()
        .map(|s| s.uri())
        .collect::<Vec<_>>()
        .join(" ");

    let client = fast_client().retry_max(4).build().unwrap();
    let err = client.get(&targets).await.unwrap_err();

    assert!(err.to_string().contains("giving up after 5 attempts"), "{err}");
    assert_eq!(*order.lock().unwrap(), ["A", "B", "C", "A", "B"]);
}

#[tokio::test]
async fn test_first_target_offsets_rotation() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut servers = Vec::new();

    for label in ["A", "B"] {
        let server = MockServer::start().await;
        let order = order.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| {
                order.lock().unwrap().push(label);
                ResponseTemplate::new(200)
            })
            .mount(&server)
            .await;
        servers.push(server);
    }

    let targets = format!("{} {}", servers[0].uri(), servers[1].uri());
    let client = fast_client().first_target(1).build().unwrap();

    // The cursor restarts for every call.
    client.get(&targets).await.unwrap();
    client.get(&targets).await.unwrap();

    assert_eq!(*order.lock().unwrap(), ["B", "B"]);
}

#[tokio::test]
async fn test_multi_target_skips_unreachable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/foo/bar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let logger = RecordingLogger::default();
    let client = fast_client().logger(logger.clone()).build().unwrap();
    let targets = format!("http://127.0.0.1:1/foo/bar {}/foo/bar", mock_server.uri());
    let response = client.get(&targets).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.attempts(), 2);
    assert!(response.url().as_str().starts_with(&mock_server.uri()));

    let entries = logger.entries.lock().unwrap();
    assert!(entries
        .iter()
        .any(|(severity, msg)| *severity == Severity::Error && msg.contains("request failed")));
}

#[tokio::test]
async fn test_cancellation_during_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let policy = CountingPolicy::default();
    let client = fast_client().check_for_retry(policy.clone()).build().unwrap();

    let (ctx, handle) = Context::background().with_cancel();
    let request = Request::new("GET", &mock_server.uri(), ())
        .unwrap()
        .with_context(ctx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let start = Instant::now();
    let result = client.execute(request).await;

    assert!(matches!(result, Err(Error::Cancelled)), "{result:?}");
    assert_eq!(policy.calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancelled_before_execute() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let policy = CountingPolicy::default();
    let client = fast_client().check_for_retry(policy.clone()).build().unwrap();

    let (ctx, handle) = Context::background().with_cancel();
    let request = Request::new("GET", &mock_server.uri(), ())
        .unwrap()
        .with_context(ctx);
    handle.cancel();

    let result = client.execute(request).await;

    assert!(matches!(result, Err(Error::Cancelled)), "{result:?}");
    assert_eq!(policy.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_deadline_stops_retrying() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .retry_wait_min(Duration::from_millis(50))
        .retry_wait_max(Duration::from_millis(50))
        .retry_max(1000)
        .build()
        .unwrap();

    let ctx = Context::background().with_timeout(Duration::from_millis(300));
    let request = Request::new("GET", &mock_server.uri(), ())
        .unwrap()
        .with_context(ctx);

    let start = Instant::now();
    let result = client.execute(request).await;

    assert!(matches!(result, Err(Error::DeadlineExceeded)), "{result:?}");
    assert!(start.elapsed() < Duration::from_secs(5));
}

/// Sends `body` to a server that fails twice, and checks every attempt carried
/// the same payload, method and headers.
async fn assert_replayed(body: Body) {
    let mock_server = MockServer::start().await;
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();

    Mock::given(method("PUT"))
        .and(path("/v1/foo"))
        .and(header("foo", "bar"))
        .respond_with(move |req: &wiremock::Request| {
            let mut received = received_clone.lock().unwrap();
            received.push(req.body.clone());
            if received.len() < 3 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200)
            }
        })
        .mount(&mock_server)
        .await;

    let label = format!("{body:?}");
    let request = Request::new("PUT", &format!("{}/v1/foo", mock_server.uri()), body)
        .unwrap()
        .header("foo", "bar")
        .unwrap();
    assert_eq!(request.content_length(), Some(5), "{label}");

    let client = fast_client().retry_max(5).build().unwrap();
    let response = client.execute(request).await.unwrap();

    assert_eq!(response.status().as_u16(), 200, "{label}");
    let received = received.lock().unwrap();
    assert_eq!(received.len(), 3, "{label}");
    for payload in received.iter() {
        assert_eq!(payload, b"hello", "{label}");
    }
}

/// A reader that is neither seekable nor sized.
struct CustomReader {
    pos: usize,
}

impl Read for CustomReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let data = b"hello";
        let n = (data.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[tokio::test]
async fn test_body_replayed_for_every_body_kind() {
    assert_replayed(b"hello".to_vec().into()).await;
    assert_replayed("hello".into()).await;
    assert_replayed(Body::buffer(b"hello")).await;
    assert_replayed(Body::seekable(Cursor::new(b"hello".to_vec()))).await;
    assert_replayed(Body::reader(CustomReader { pos: 0 })).await;
    assert_replayed(Body::producer(|| {
        Ok(Box::new(Cursor::new(b"hello".to_vec())) as _)
    }))
    .await;
}

#[tokio::test]
async fn test_body_replay_failure_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    // The first call happens while building the request.
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let body = Body::producer(move || {
        if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Box::new(Cursor::new(b"hello".to_vec())) as _)
        } else {
            Err(std::io::Error::other("source gone"))
        }
    });

    let request = Request::new("POST", &mock_server.uri(), body).unwrap();
    let result = fast_client().build().unwrap().execute(request).await;

    assert!(matches!(result, Err(Error::Body(_))), "{result:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_policy_error_overrides_and_stops() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("test_500_body"))
        .expect(2)
        .mount(&mock_server)
        .await;

    struct FailSecond {
        calls: AtomicUsize,
    }

    impl RetryPolicy for FailSecond {
        fn check(
            &self,
            ctx: &Context,
            response: Option<&reqwest::Response>,
            error: Option<&Error>,
        ) -> RetryDecision {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                DefaultRetryPolicy.check(ctx, response, error)
            } else {
                RetryDecision::Fail(Error::policy("retryError"))
            }
        }
    }

    let client = fast_client()
        .check_for_retry(FailSecond {
            calls: AtomicUsize::new(0),
        })
        .build()
        .unwrap();
    let result = client.get(&mock_server.uri()).await;

    match result {
        Err(Error::Policy(err)) => assert_eq!(err.to_string(), "retryError"),
        other => panic!("Expected Policy error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_policy_stop_returns_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("test_500_body"))
        .expect(1)
        .mount(&mock_server)
        .await;

    struct NeverRetry;

    impl RetryPolicy for NeverRetry {
        fn check(
            &self,
            _: &Context,
            _: Option<&reqwest::Response>,
            _: Option<&Error>,
        ) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    let client = fast_client().check_for_retry(NeverRetry).build().unwrap();
    let response = client.get(&mock_server.uri()).await.unwrap();

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(response.text().await.unwrap(), "test_500_body");
}

#[tokio::test]
async fn test_custom_backoff_called_once_per_retry() {
    struct CountingBackoff {
        calls: Arc<AtomicUsize>,
    }

    impl reattempt::Backoff for CountingBackoff {
        fn delay(
            &self,
            _: Duration,
            _: Duration,
            _: usize,
            _: Option<&reqwest::Response>,
        ) -> Duration {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Duration::from_millis(1)
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let client = Client::builder()
        .backoff(CountingBackoff {
            calls: calls.clone(),
        })
        .build()
        .unwrap();
    let retry_max = client.retry_max();

    let mock_server = MockServer::start().await;
    let calls_clone = calls.clone();
    Mock::given(method("GET"))
        .and(path("/foo/bar"))
        .respond_with(move |_req: &wiremock::Request| {
            if calls_clone.load(Ordering::SeqCst) == retry_max {
                ResponseTemplate::new(200)
            } else {
                ResponseTemplate::new(500)
            }
        })
        .mount(&mock_server)
        .await;

    let response = client
        .get(&format!("{}/foo/bar", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), retry_max);
    assert_eq!(response.attempts(), retry_max + 1);
}

#[tokio::test]
async fn test_retry_announcements_are_logged() {
    let mock_server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .respond_with(flaky(1, hits))
        .mount(&mock_server)
        .await;

    let logger = RecordingLogger::default();
    let client = fast_client().logger(logger.clone()).build().unwrap();
    client.get(&mock_server.uri()).await.unwrap();

    let entries = logger.entries.lock().unwrap();
    assert_eq!(entries.len(), 1, "{entries:?}");
    let (severity, message) = &entries[0];
    assert_eq!(*severity, Severity::Debug);
    assert!(message.contains("status: 500"), "{message}");
    assert!(message.contains("retrying in"), "{message}");
    assert!(message.contains("(10 left)"), "{message}");
}

#[tokio::test]
async fn test_unusable_scheduled_target_reuses_previous_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    struct Bogus;

    impl Scheduler for Bogus {
        fn next<'a>(
            &self,
            _targets: &'a [String],
            cursor: usize,
        ) -> reattempt::Result<(&'a str, usize)> {
            Ok(("not a url", cursor))
        }
    }

    let logger = RecordingLogger::default();
    let client = fast_client()
        .scheduler(Bogus)
        .logger(logger.clone())
        .build()
        .unwrap();
    let response = client.get(&mock_server.uri()).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let entries = logger.entries.lock().unwrap();
    assert!(entries
        .iter()
        .any(|(severity, msg)| *severity == Severity::Error && msg.contains("not a url")));
}

#[tokio::test]
async fn test_invalid_targets_fail_before_sending() {
    let client = fast_client().build().unwrap();

    assert!(matches!(
        client.get("://foo/bar").await,
        Err(Error::InvalidUrl { .. })
    ));
    assert!(matches!(
        client.head("http://ok ://foo/bar").await,
        Err(Error::InvalidUrl { .. })
    ));
    assert!(matches!(
        client.post("", "text/plain", "x").await,
        Err(Error::NoTargets)
    ));
}

#[tokio::test]
async fn test_all_http_methods() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/foo/bar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    for verb in ["POST", "PUT", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/foo/bar"))
            .and(header("content-type", "application/json"))
            .and(body_string("hello"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = fast_client().build().unwrap();
    let url = format!("{}/foo/bar", mock_server.uri());
    let json = "application/json";

    assert_eq!(client.head(&url).await.unwrap().status().as_u16(), 200);
    assert_eq!(client.post(&url, json, "hello").await.unwrap().status().as_u16(), 200);
    assert_eq!(client.put(&url, json, "hello").await.unwrap().status().as_u16(), 200);
    assert_eq!(client.patch(&url, json, "hello").await.unwrap().status().as_u16(), 200);
    assert_eq!(client.delete(&url, json, "hello").await.unwrap().status().as_u16(), 200);
}

#[tokio::test]
async fn test_post_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/foo/bar"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("hello=world"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client().build().unwrap();
    let response = client
        .post_form(&format!("{}/foo/bar", mock_server.uri()), &[("hello", "world")])
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    assert!(client.post_form("://foo/bar", &[("hello", "world")]).await.is_err());
}

#[tokio::test]
async fn test_default_client_functions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/foo/bar"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/foo/bar"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let url = format!("{}/foo/bar", mock_server.uri());
    assert_eq!(reattempt::get(&url).await.unwrap().status().as_u16(), 200);
    assert_eq!(reattempt::head(&url).await.unwrap().status().as_u16(), 404);
    assert_eq!(
        reattempt::put(&url, "text/plain", "hello").await.unwrap().status().as_u16(),
        204
    );
    assert_eq!(reattempt::default_client().retry_max(), reattempt::DEFAULT_RETRY_MAX);
}

#[tokio::test]
async fn test_json_response_and_body() {
    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    struct TestData {
        id: u32,
        name: String,
    }

    let mock_server = MockServer::start().await;
    let data = TestData {
        id: 1,
        name: "Test".to_string(),
    };

    Mock::given(method("POST"))
        .and(body_string(r#"{"id":1,"name":"Test"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_json(&data))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client().build().unwrap();
    let response = client
        .post(&mock_server.uri(), "application/json", Body::json(&data).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    assert_eq!(response.json::<TestData>().await.unwrap(), data);
}
