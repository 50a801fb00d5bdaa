//! The canonical response produced by the normalizer.
//!
//! # Design Decisions
//! - Status text is optional; the canonical reason phrase is used when unset
//! - Cloning is cheap (see [`Body`]) so a response can be memoized

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;

use super::body::{Body, BodyError};

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    status_text: Option<String>,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// A `200 OK` response with the given body.
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            status: StatusCode::OK,
            status_text: None,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Body::Empty)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Custom status text, falling back to the canonical reason phrase.
    pub fn status_text(&self) -> &str {
        self.status_text
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub async fn text(self) -> Result<String, BodyError> {
        self.body.text().await
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, BodyError> {
        self.body.json().await
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::empty()
    }
}
