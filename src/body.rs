//! Request bodies that can be replayed on every attempt.
//!
//! A retried request has to send the same payload again, so every supported
//! body representation is turned into a [`BodyProducer`] once, when the request
//! is built. The producer hands out a fresh, rewound reader each time the
//! dispatch loop asks for one.

use crate::{Error, Result};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

/// A function producing a fresh reader over the request payload on every call.
pub type ReaderFn = dyn Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync;

/// A readable and seekable stream.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// The payload of a [`Request`](crate::Request), in any of the forms the client can replay.
///
/// Most callers never name a variant: `Vec<u8>`, strings, byte slices and `()`
/// convert into a `Body`, and the constructors cover streams and factories.
///
/// # Examples
///
/// ```
/// use reattempt::Body;
/// use std::io::Cursor;
///
/// let bytes: Body = b"hello".to_vec().into();
/// let text: Body = "hello".into();
/// let stream = Body::reader(Cursor::new(b"hello".to_vec()));
/// let factory = Body::producer(|| Ok(Box::new(Cursor::new(b"hello".to_vec())) as _));
/// # let _ = (bytes, text, stream, factory);
/// ```
#[derive(Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,

    /// An immutable byte sequence.
    Bytes(Vec<u8>),

    /// The contents of a growable buffer, captured when the body was created.
    ///
    /// Later changes to the original buffer are not seen.
    Buffer(Vec<u8>),

    /// A seekable stream, rewound to its start for every attempt.
    ///
    /// The stream is shared across attempts, and across clones of the request,
    /// behind a lock. Each attempt rewinds and reads it whole while holding the
    /// lock, so concurrent attempts see identical payloads.
    Seekable(Box<dyn ReadSeek>),

    /// A one-shot stream, read fully into memory when the request is built.
    Reader(Box<dyn Read + Send>),

    /// A factory returning a fresh reader for each attempt.
    Producer(Arc<ReaderFn>),
}

impl Body {
    /// Creates a body from a reader factory.
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync + 'static,
    {
        Body::Producer(Arc::new(f))
    }

    /// Creates a body from a seekable stream.
    pub fn seekable<R: Read + Seek + Send + 'static>(stream: R) -> Self {
        Body::Seekable(Box::new(stream))
    }

    /// Creates a body from a one-shot reader.
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Body::Reader(Box::new(reader))
    }

    /// Captures the current contents of a buffer.
    pub fn buffer(contents: &[u8]) -> Self {
        Body::Buffer(contents.to_vec())
    }

    /// Serializes `value` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_vec(value)
            .map(Body::Bytes)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    /// Encodes key/value pairs as `application/x-www-form-urlencoded`.
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Body::Bytes(encoded.into_bytes())
    }

    /// Converts a dynamically typed value into a body.
    ///
    /// Recognizes `Body`, `()`, `Vec<u8>`, `String`, `&'static str`,
    /// `&'static [u8]`, `Cursor<Vec<u8>>` and `std::fs::File`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBodyType`] naming the type of any other value.
    ///
    /// ```
    /// use reattempt::{Body, Error};
    ///
    /// assert!(Body::from_any(b"yo".to_vec()).is_ok());
    /// assert!(matches!(
    ///     Body::from_any(42u32),
    ///     Err(Error::InvalidBodyType(name)) if name == "u32"
    /// ));
    /// ```
    pub fn from_any<T: Any + Send>(value: T) -> Result<Self> {
        let type_name = std::any::type_name::<T>();
        let mut slot = Some(value);
        let any: &mut dyn Any = &mut slot;

        if let Some(body) = take::<Body>(any) {
            return Ok(body);
        }
        if take::<()>(any).is_some() {
            return Ok(Body::Empty);
        }
        if let Some(bytes) = take::<Vec<u8>>(any) {
            return Ok(Body::Bytes(bytes));
        }
        if let Some(text) = take::<String>(any) {
            return Ok(text.into());
        }
        if let Some(text) = take::<&'static str>(any) {
            return Ok(text.into());
        }
        if let Some(bytes) = take::<&'static [u8]>(any) {
            return Ok(bytes.into());
        }
        if let Some(cursor) = take::<Cursor<Vec<u8>>>(any) {
            return Ok(Body::seekable(cursor));
        }
        if let Some(file) = take::<std::fs::File>(any) {
            return Ok(Body::seekable(file));
        }

        Err(Error::InvalidBodyType(type_name.to_string()))
    }

    /// Turns this body into a replayable producer and its content length.
    ///
    /// The length is `None` when it cannot be determined. An empty body yields no
    /// producer at all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Body`] if a producer fails on its first call or a stream
    /// cannot be read or rewound.
    pub fn materialize(self) -> Result<(Option<BodyProducer>, Option<u64>)> {
        match self {
            Body::Empty => Ok((None, None)),
            Body::Bytes(bytes) | Body::Buffer(bytes) => {
                let len = bytes.len() as u64;
                Ok((Some(BodyProducer::Bytes(bytes.into())), Some(len)))
            }
            Body::Seekable(mut stream) => {
                let len = stream.seek(SeekFrom::End(0)).map_err(Error::Body)?;
                stream.seek(SeekFrom::Start(0)).map_err(Error::Body)?;
                let shared = Arc::new(Mutex::new(stream));
                Ok((Some(BodyProducer::Seekable(shared)), Some(len)))
            }
            Body::Reader(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes).map_err(Error::Body)?;
                let len = bytes.len() as u64;
                Ok((Some(BodyProducer::Bytes(bytes.into())), Some(len)))
            }
            Body::Producer(f) => {
                // Call once so a broken factory fails at construction.
                let mut sample = f().map_err(Error::Body)?;
                let len = io::copy(&mut sample, &mut io::sink()).map_err(Error::Body)?;
                Ok((Some(BodyProducer::Func(f)), Some(len)))
            }
        }
    }
}

fn take<T: Any>(any: &mut dyn Any) -> Option<T> {
    any.downcast_mut::<Option<T>>()?.take()
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::Buffer(b) => f.debug_tuple("Buffer").field(&b.len()).finish(),
            Body::Seekable(_) => f.write_str("Seekable(..)"),
            Body::Reader(_) => f.write_str("Reader(..)"),
            Body::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::Empty
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<&Vec<u8>> for Body {
    fn from(buffer: &Vec<u8>) -> Self {
        Body::buffer(buffer)
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Body::Bytes(bytes.to_vec())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Bytes(text.into_bytes())
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Bytes(text.as_bytes().to_vec())
    }
}

/// Hands out a fresh reader over the request payload for each attempt.
#[derive(Clone)]
pub enum BodyProducer {
    /// Bytes captured in memory.
    Bytes(Arc<[u8]>),
    /// A shared seekable stream.
    Seekable(Arc<Mutex<Box<dyn ReadSeek>>>),
    /// A caller supplied factory.
    Func(Arc<ReaderFn>),
}

impl BodyProducer {
    /// Returns a reader positioned at the start of the payload.
    ///
    /// A seekable stream is read into memory under its lock before this returns.
    ///
    /// # Errors
    ///
    /// Fails if the stream cannot be rewound or the factory fails.
    pub fn produce(&self) -> io::Result<Box<dyn Read + Send>> {
        match self {
            BodyProducer::Bytes(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
            BodyProducer::Seekable(stream) => Ok(Box::new(Cursor::new(rewind_and_read(stream)?))),
            BodyProducer::Func(f) => f(),
        }
    }

    /// Produces the full payload in memory.
    pub(crate) fn replay(&self) -> io::Result<Vec<u8>> {
        match self {
            BodyProducer::Bytes(bytes) => Ok(bytes.to_vec()),
            BodyProducer::Seekable(stream) => rewind_and_read(stream),
            BodyProducer::Func(f) => {
                let mut buf = Vec::new();
                f()?.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

impl fmt::Debug for BodyProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyProducer::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            BodyProducer::Seekable(_) => f.write_str("Seekable(..)"),
            BodyProducer::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Rewinds a shared stream and reads it to the end without releasing the lock,
/// so clones of one producer never interleave their seeks and reads.
fn rewind_and_read(stream: &Mutex<Box<dyn ReadSeek>>) -> io::Result<Vec<u8>> {
    let mut stream = stream
        .lock()
        .map_err(|_| io::Error::other("body stream lock poisoned"))?;
    stream.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}
