//! Target selection across attempts.
//!
//! A request may name several equivalent endpoints. Before each attempt the
//! client hands the target list and a cursor to its [`Scheduler`], which picks the
//! target for that attempt and returns the cursor to use next time. The cursor
//! lives only for the duration of one [`Client::execute`](crate::Client::execute)
//! call, so concurrent calls never disturb each other's rotation.

use crate::{Error, Result};

/// Picks the target for the next attempt.
///
/// Implementations must be stateless apart from the threaded cursor, and must
/// return one of the supplied targets.
///
/// # Examples
///
/// ```
/// use reattempt::{Error, Scheduler};
///
/// /// Always sends to the first target.
/// struct Primary;
///
/// impl Scheduler for Primary {
///     fn next<'a>(
///         &self,
///         targets: &'a [String],
///         cursor: usize,
///     ) -> Result<(&'a str, usize), Error> {
///         let first = targets.first().ok_or(Error::NoTargets)?;
///         Ok((first.as_str(), cursor))
///     }
/// }
/// ```
pub trait Scheduler: Send + Sync {
    /// Returns the selected target and the next cursor.
    ///
    /// # Errors
    ///
    /// An error aborts the request.
    fn next<'a>(&self, targets: &'a [String], cursor: usize) -> Result<(&'a str, usize)>;
}

/// Cycles through the targets in order, wrapping around at the end.
///
/// ```
/// use reattempt::{RoundRobin, Scheduler};
///
/// let targets = vec!["http://a".to_string(), "http://b".to_string()];
/// let (first, cursor) = RoundRobin.next(&targets, 0).unwrap();
/// let (second, cursor) = RoundRobin.next(&targets, cursor).unwrap();
/// let (third, _) = RoundRobin.next(&targets, cursor).unwrap();
/// assert_eq!([first, second, third], ["http://a", "http://b", "http://a"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl Scheduler for RoundRobin {
    fn next<'a>(&self, targets: &'a [String], cursor: usize) -> Result<(&'a str, usize)> {
        if targets.is_empty() {
            return Err(Error::NoTargets);
        }
        let index = if cursor >= targets.len() { 0 } else { cursor };
        Ok((targets[index].as_str(), index + 1))
    }
}
