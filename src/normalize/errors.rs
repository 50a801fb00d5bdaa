//! Default error responses.

use axum::http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::HttpError;
use crate::event::Event;
use crate::http::headers::merge_headers;
use crate::http::Response;

use super::body::JSON_CONTENT_TYPE;

pub(super) fn log_unhandled(error: &HttpError, event: &Event) {
    tracing::error!(
        method = %event.method(),
        path = %event.path(),
        status = error.status().as_u16(),
        error = %error.message(),
        "Unhandled error"
    );
}

/// JSON response for an error. `event.res` is not merged in.
///
/// In debug mode the body is pretty-printed, carries `stack`, and unhandled
/// errors keep their real message.
pub fn error_response(error: &HttpError, config: &AppConfig) -> Response {
    let mut body = error.to_json();
    if config.debug() {
        if let Value::Object(map) = &mut body {
            if error.is_unhandled() {
                map.insert("message".into(), json!(error.message()));
            }
            map.insert("stack".into(), json!(error.stack()));
        }
    }

    let bytes = if config.debug() {
        serde_json::to_vec_pretty(&body)
    } else {
        serde_json::to_vec(&body)
    }
    .unwrap_or_default();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    if let Some(extra) = error.headers() {
        merge_headers(&mut headers, extra);
    }

    let mut response = Response::new(bytes)
        .with_status(error.status())
        .with_headers(headers);
    if let Some(text) = error.status_text() {
        response = response.with_status_text(text);
    }
    response
}
