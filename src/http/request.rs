//! The standard request shape consumed by the dispatcher.
//!
//! # Responsibilities
//! - Carry method, absolute URL, headers and body
//! - Resolve relative inputs (`/path`) against the `Host` header
//!
//! # Design Decisions
//! - The URL is always absolute; relative inputs default to `http://localhost`
//! - A `Host` value that is not a bare authority is ignored, so it can never
//!   change the routed path
//! - Cloning is cheap (see [`Body`])

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, HOST};
use axum::http::Method;
use serde::de::DeserializeOwned;
use url::Url;

use super::body::{Body, BodyError};

const DEFAULT_HOST: &str = "localhost";

/// Errors raised while building a [`Request`].
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid request url `{input}`: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    /// Create a request. `input` is either an absolute URL or a path starting with `/`.
    pub fn new(method: Method, input: &str) -> Result<Self, RequestError> {
        Self::with_headers(method, input, HeaderMap::new())
    }

    /// Create a request, resolving a relative input against the `Host` and
    /// `X-Forwarded-Proto` headers.
    pub fn with_headers(
        method: Method,
        input: &str,
        headers: HeaderMap,
    ) -> Result<Self, RequestError> {
        let absolute = if input.starts_with('/') {
            let host = headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .filter(|h| is_authority(h))
                .unwrap_or(DEFAULT_HOST);
            let proto = match headers.get("x-forwarded-proto").and_then(|h| h.to_str().ok()) {
                Some("https") => "https",
                _ => "http",
            };
            format!("{proto}://{host}{input}")
        } else {
            input.to_string()
        };

        let url = Url::parse(&absolute).map_err(|source| RequestError::InvalidUrl {
            input: input.to_string(),
            source,
        })?;

        Ok(Self::from_parts(method, url, headers, Body::Empty))
    }

    pub fn from_parts(method: Method, url: Url, headers: HeaderMap, body: Body) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
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

    /// Copy of this request pointed at a different URL.
    pub fn with_url(&self, url: Url) -> Self {
        Self {
            method: self.method.clone(),
            url,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub async fn text(&self) -> Result<String, BodyError> {
        self.body.clone().text().await
    }

    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        self.body.clone().json().await
    }
}

/// `host[:port]` with nothing that would start a path, query, fragment or userinfo.
fn is_authority(host: &str) -> bool {
    if host.is_empty()
        || host
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '@' | '\\') || c.is_whitespace() || c.is_control())
    {
        return false;
    }
    Url::parse(&format!("http://{host}/")).is_ok_and(|url| url.path() == "/")
}
