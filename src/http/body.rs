//! Request and response bodies.
//!
//! # Design Decisions
//! - `Body` is cheap to clone: bytes are reference counted and a stream is
//!   shared, so a memoized chain result can be handed out more than once
//! - A stream can be consumed only once; later readers see `StreamConsumed`

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed stream of body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Errors raised while reading a body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("body stream was already consumed")]
    StreamConsumed,

    #[error("body stream failed: {0}")]
    Stream(#[source] BoxError),

    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A streamed body shared between clones; taken by the first reader.
#[derive(Clone)]
pub struct StreamBody {
    inner: Arc<Mutex<Option<ByteStream>>>,
}

impl StreamBody {
    pub fn new<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Some(stream.map_err(Into::into).boxed()))),
        }
    }

    /// Take the underlying stream, leaving the body consumed.
    pub fn take(&self) -> Option<ByteStream> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl fmt::Debug for StreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamBody { .. }")
    }
}

#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Stream(StreamBody),
}

impl Body {
    pub fn empty() -> Self {
        Body::Empty
    }

    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Body::Stream(StreamBody::new(stream))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(bytes) => bytes.is_empty(),
            Body::Stream(_) => false,
        }
    }

    /// Exact length when known without reading.
    pub fn size_hint(&self) -> Option<usize> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(bytes) => Some(bytes.len()),
            Body::Stream(_) => None,
        }
    }

    /// Convert into a chunk stream.
    pub fn into_stream(self) -> ByteStream {
        match self {
            Body::Empty => stream::empty().boxed(),
            Body::Bytes(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Body::Stream(body) => body.take().unwrap_or_else(|| {
                stream::once(async { Err::<Bytes, BoxError>(BodyError::StreamConsumed.into()) })
                    .boxed()
            }),
        }
    }

    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, BodyError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(body) => {
                let mut stream = body.take().ok_or(BodyError::StreamConsumed)?;
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk.map_err(BodyError::Stream)?);
                }
                Ok(buf.freeze())
            }
        }
    }

    pub async fn text(self) -> Result<String, BodyError> {
        let bytes = self.collect().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, BodyError> {
        let bytes = self.collect().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes.into())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Bytes(text.into())
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_is_shared_and_taken_once() {
        let chunks = vec![Ok::<_, BoxError>(Bytes::from("a")), Ok(Bytes::from("b"))];
        let body = Body::from_stream(stream::iter(chunks));
        let copy = body.clone();

        assert_eq!(body.text().await.unwrap(), "ab");
        assert!(matches!(copy.collect().await, Err(BodyError::StreamConsumed)));
    }

    #[tokio::test]
    async fn test_stream_with_concrete_error_type() {
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from("x")), Ok(Bytes::from("y"))];
        let body = Body::from_stream(stream::iter(chunks));
        assert_eq!(body.text().await.unwrap(), "xy");
    }

    #[tokio::test]
    async fn test_json_body() {
        let body = Body::from(r#"{"a":1}"#);
        let value: serde_json::Value = body.json().await.unwrap();
        assert_eq!(value["a"], 1);
    }
}
