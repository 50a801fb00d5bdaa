//! Body dispatch and the final merge with the event response shell.

use axum::http::header::{
    HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
};
use axum::http::{Method, StatusCode};

use crate::config::AppConfig;
use crate::event::Event;
use crate::handler::{Blob, Reply};
use crate::http::headers::merge_headers;
use crate::http::{Body, Response};

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Statuses whose responses never carry a body.
pub fn is_null_body_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 100 | 101 | 102 | 204 | 205 | 304)
}

/// Body plus any status and headers implied by the returned value.
struct Prepared {
    body: Body,
    status: Option<StatusCode>,
    status_text: Option<String>,
    headers: HeaderMap,
}

impl Prepared {
    fn new(body: impl Into<Body>) -> Self {
        Self {
            body: body.into(),
            status: None,
            status_text: None,
            headers: HeaderMap::new(),
        }
    }

    fn with_length(mut self, len: usize) -> Self {
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        self
    }
}

pub(super) fn reply_response(reply: Reply, event: &Event, config: &AppConfig) -> Response {
    let prepared = match reply {
        Reply::Response(response) => return pass_through(response, event),
        Reply::Continue | Reply::Empty => Prepared::new(Body::Empty).with_length(0),
        Reply::Text(text) => Prepared::new(text),
        Reply::Bytes(bytes) => {
            let len = bytes.len();
            Prepared::new(bytes).with_length(len)
        }
        Reply::Json(value) => {
            let bytes = if config.debug() {
                serde_json::to_vec_pretty(&value)
            } else {
                serde_json::to_vec(&value)
            }
            .unwrap_or_default();
            let mut prepared = Prepared::new(bytes);
            prepared
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            prepared
        }
        Reply::Blob(blob) => blob_body(blob),
        Reply::Stream(stream) => Prepared::new(Body::Stream(stream)),
        Reply::Partial(partial) => Prepared {
            body: partial.body,
            status: partial.status,
            status_text: partial.status_text,
            headers: partial.headers,
        },
        // Resolved by the caller before body dispatch.
        Reply::Handled | Reply::NotFound => Prepared::new(Body::Empty),
    };

    finish(prepared, event)
}

fn blob_body(blob: Blob) -> Prepared {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(blob.content_type()) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(blob.len()));
    if let Some(name) = blob.name() {
        let encoded = urlencoding::encode(name);
        let disposition = format!("filename=\"{encoded}\"; filename*=UTF-8''{encoded}");
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(CONTENT_DISPOSITION, value);
        }
    }
    Prepared {
        headers,
        ..Prepared::new(blob.bytes().clone())
    }
}

/// Explicit status wins over `event.res`; event headers are merged over produced ones.
fn finish(prepared: Prepared, event: &Event) -> Response {
    let shell = event.res();
    let (status, status_text) = match prepared.status {
        Some(status) => (status, prepared.status_text),
        None => (
            shell.and_then(|res| res.status()).unwrap_or(StatusCode::OK),
            prepared
                .status_text
                .or_else(|| shell.and_then(|res| res.status_text()).map(str::to_string)),
        ),
    };

    let mut headers = prepared.headers;
    if let Some(overrides) = shell.and_then(|res| res.headers()) {
        merge_headers(&mut headers, overrides);
    }

    let body = if is_null_body(event.method(), status) {
        Body::Empty
    } else {
        prepared.body
    };

    let mut response = Response::new(body).with_status(status).with_headers(headers);
    if let Some(text) = status_text {
        response = response.with_status_text(text);
    }
    response
}

fn pass_through(mut response: Response, event: &Event) -> Response {
    if let Some(overrides) = event.res().and_then(|res| res.headers()) {
        merge_headers(response.headers_mut(), overrides);
    }
    strip_null_body(response, event.method())
}

/// Drop the body of a finished response when `method` or its status forbids one.
pub(crate) fn strip_null_body(mut response: Response, method: &Method) -> Response {
    if is_null_body(method, response.status()) {
        response.set_body(Body::Empty);
    }
    response
}

fn is_null_body(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD || is_null_body_status(status)
}
