//! Forwarding the current request to another server.
//!
//! # Data Flow
//! ```text
//! Event
//!     → proxy request headers (hop-by-hop and client-only headers dropped)
//!     → body (payload methods only, read into memory)
//!     → reqwest → upstream
//!     → response headers (encoding and length dropped, cookies rewritten)
//!     → streamed Response
//! ```
//!
//! A transport failure becomes `502 Bad Gateway`.

use std::collections::HashMap;

use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, HOST, SET_COOKIE,
};
use axum::http::Method;
use cookie::Cookie;

use crate::app::App;
use crate::error::{Error, HttpError};
use crate::event::Event;
use crate::handler::Reply;
use crate::http::headers::merge_headers;
use crate::http::{Body, Request, Response};

/// Request headers never copied to the upstream unless listed in `forward_headers`.
const IGNORED_HEADERS: [&str; 8] = [
    "transfer-encoding",
    "accept-encoding",
    "connection",
    "keep-alive",
    "upgrade",
    "expect",
    "host",
    "accept",
];

/// Replacement for a cookie attribute: one value for all, or keyed by the old value
/// with `*` as the fallback key. An empty replacement removes the attribute.
#[derive(Debug, Clone)]
pub enum CookieRewrite {
    All(String),
    Map(HashMap<String, String>),
}

impl CookieRewrite {
    fn replacement(&self, current: &str) -> Option<&str> {
        match self {
            CookieRewrite::All(value) => Some(value),
            CookieRewrite::Map(map) => map.get(current).or_else(|| map.get("*")).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProxyOptions {
    /// Sent to the upstream, replacing forwarded values.
    pub headers: HeaderMap,
    pub forward_headers: Vec<HeaderName>,
    pub filter_headers: Vec<HeaderName>,
    /// Defaults to the request method.
    pub method: Option<Method>,
    pub cookie_domain_rewrite: Option<CookieRewrite>,
    pub cookie_path_rewrite: Option<CookieRewrite>,
    /// Reused across calls when set.
    pub client: Option<reqwest::Client>,
}

impl ProxyOptions {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }
}

/// The request headers minus those known to break a proxied request.
///
/// `host` keeps the `Host` header, for targets on the same server.
pub fn get_proxy_request_headers(event: &Event, host: bool, options: &ProxyOptions) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in event.headers() {
        if options.filter_headers.contains(name) {
            continue;
        }
        let ignored = IGNORED_HEADERS.contains(&name.as_str());
        if options.forward_headers.contains(name) || !ignored || (*name == HOST && host) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Forward the request to `target` and return the upstream response.
///
/// A relative `target` is resolved against the request URL and keeps the `Host` header.
pub async fn proxy_request(
    event: &Event,
    target: &str,
    options: &ProxyOptions,
) -> Result<Reply, Error> {
    let relative = target.starts_with('/');
    let url = event.req().url().join(target).map_err(|error| {
        HttpError::from_status(400, None)
            .with_message(format!("Invalid proxy target `{target}`"))
            .with_cause(error)
    })?;

    let mut headers = get_proxy_request_headers(event, relative, options);
    merge_headers(&mut headers, &options.headers);

    let method = options.method.clone().unwrap_or_else(|| event.method().clone());
    let body = if is_payload_method(event.method()) {
        Some(event.req().body().clone().collect().await?)
    } else {
        None
    };

    let client = options.client.clone().unwrap_or_default();
    let mut request = client.request(method, url.clone()).headers(headers);
    if let Some(body) = body {
        request = request.body(body);
    }

    let upstream = request.send().await.map_err(|error| {
        tracing::warn!(target = %url, error = %error, "Upstream request failed");
        HttpError::bad_gateway(error)
    })?;

    tracing::debug!(target = %url, status = upstream.status().as_u16(), "Proxied request");
    Ok(Reply::Response(into_response(upstream, options)))
}

/// Fetch `path` from `app` with the current request headers, or an absolute URL
/// over the network without them.
pub async fn fetch_with_event(
    app: &App,
    event: &Event,
    method: Method,
    path: &str,
) -> Result<Response, Error> {
    if !path.starts_with('/') {
        let response = reqwest::Client::new()
            .request(method, path)
            .send()
            .await
            .map_err(HttpError::bad_gateway)?;
        return Ok(into_response(response, &ProxyOptions::default()));
    }

    let url = event.req().url().join(path).map_err(|error| {
        HttpError::from_status(400, None)
            .with_message(format!("Invalid sub-request path `{path}`"))
            .with_cause(error)
    })?;
    let headers = get_proxy_request_headers(event, true, &ProxyOptions::default());
    Ok(app.fetch(Request::from_parts(method, url, headers, Body::Empty)).await)
}

fn is_payload_method(method: &Method) -> bool {
    matches!(*method, Method::PATCH | Method::POST | Method::PUT | Method::DELETE)
}

fn into_response(upstream: reqwest::Response, options: &ProxyOptions) -> Response {
    let status = upstream.status();
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if *name == CONTENT_ENCODING || *name == CONTENT_LENGTH {
            continue;
        }
        if *name == SET_COOKIE {
            let value = rewrite_cookie(value, options).unwrap_or_else(|| value.clone());
            headers.append(SET_COOKIE, value);
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()))
        .with_status(status)
        .with_headers(headers);
    if let Some(reason) = status.canonical_reason() {
        response = response.with_status_text(reason);
    }
    response
}

/// `None` when nothing is rewritten or the header does not parse.
fn rewrite_cookie(value: &HeaderValue, options: &ProxyOptions) -> Option<HeaderValue> {
    if options.cookie_domain_rewrite.is_none() && options.cookie_path_rewrite.is_none() {
        return None;
    }
    let mut cookie = Cookie::parse(value.to_str().ok()?.to_string()).ok()?;

    if let Some(rewrite) = &options.cookie_domain_rewrite {
        let current = cookie.domain().map(str::to_string);
        match current.as_deref().and_then(|domain| rewrite.replacement(domain)) {
            Some("") => cookie.unset_domain(),
            Some(domain) => cookie.set_domain(domain.to_string()),
            None => {}
        }
    }
    if let Some(rewrite) = &options.cookie_path_rewrite {
        let current = cookie.path().map(str::to_string);
        match current.as_deref().and_then(|path| rewrite.replacement(path)) {
            Some("") => cookie.unset_path(),
            Some(path) => cookie.set_path(path.to_string()),
            None => {}
        }
    }
    HeaderValue::from_str(&cookie.to_string()).ok()
}
