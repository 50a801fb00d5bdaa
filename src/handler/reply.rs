//! Values produced by handlers and middleware.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::http::body::StreamBody;
use crate::http::{Body, Response};

/// Result of running a handler, a middleware or a whole chain.
pub type Outcome = Result<Reply, Error>;

/// Raw return value of a chain step, turned into a [`Response`] by the normalizer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// No value. In middleware it means "continue"; from a handler it yields an empty body.
    Continue,
    /// No route matched.
    NotFound,
    /// The transport already wrote the output.
    Handled,
    /// An explicit empty body.
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(Value),
    Blob(Blob),
    Stream(StreamBody),
    /// Body plus status/headers, merged with the event response shell.
    Partial(PartialResponse),
    /// A finished response, passed through.
    Response(Response),
}

impl Reply {
    /// Serialize a value as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }

    /// Returns true for values that let a middleware chain continue.
    pub fn is_fallthrough(&self) -> bool {
        matches!(self, Reply::Continue | Reply::NotFound)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Continue
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Reply::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Reply::Bytes(bytes.into())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<Blob> for Reply {
    fn from(blob: Blob) -> Self {
        Reply::Blob(blob)
    }
}

impl From<PartialResponse> for Reply {
    fn from(partial: PartialResponse) -> Self {
        Reply::Partial(partial)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

/// In-memory bytes with a content type and an optional file name.
#[derive(Debug, Clone)]
pub struct Blob {
    bytes: Bytes,
    content_type: String,
    name: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            name: None,
        }
    }

    /// A named blob (a file); the name is sent as `content-disposition`.
    pub fn file(
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(bytes, content_type)
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A body with optional status and headers, completed by the normalizer.
#[derive(Debug, Clone, Default)]
pub struct PartialResponse {
    pub body: Body,
    pub status: Option<StatusCode>,
    pub status_text: Option<String>,
    pub headers: HeaderMap,
}

impl PartialResponse {
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}
