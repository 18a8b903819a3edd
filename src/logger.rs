//! Observability hook for the dispatch loop.

use crate::{Error, Request};
use std::fmt;

/// Severity of a log message emitted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// A failed attempt, an unusable target, or a body drain failure.
    Error,
    /// A retry announcement.
    Debug,
}

impl Severity {
    /// The tag for this severity: `"ERROR"` or `"DEBUG"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives the client's error and retry messages.
///
/// `request` is `None` for messages that are not tied to a request, such as a
/// failure to drain a response body.
///
/// # Examples
///
/// ```
/// use reattempt::{Error, Logger, Request, Severity};
///
/// struct Stderr;
///
/// impl Logger for Stderr {
///     fn log(
///         &self,
///         _request: Option<&Request>,
///         severity: Severity,
///         message: &str,
///         error: Option<&Error>,
///     ) {
///         match error {
///             Some(err) => eprintln!("{severity} {message}{err}"),
///             None => eprintln!("{severity} {message}"),
///         }
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Records one message.
    fn log(
        &self,
        request: Option<&Request>,
        severity: Severity,
        message: &str,
        error: Option<&Error>,
    );
}

/// Forwards messages to [`tracing`] as `error` and `debug` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(
        &self,
        request: Option<&Request>,
        severity: Severity,
        message: &str,
        error: Option<&Error>,
    ) {
        let method = request.map(|r| r.method().as_str()).unwrap_or("-");
        let url = request.map(|r| r.url().as_str()).unwrap_or("-");
        let error = error.map(|e| e.to_string());
        match severity {
            Severity::Error => tracing::error!(
                method = method,
                url = url,
                error = error.as_deref(),
                "{}",
                message
            ),
            Severity::Debug => tracing::debug!(
                method = method,
                url = url,
                error = error.as_deref(),
                "{}",
                message
            ),
        }
    }
}
