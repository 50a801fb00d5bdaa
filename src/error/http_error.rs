//! Structured HTTP errors.
//!
//! # Responsibilities
//! - Carry status, status text, message, data and extra JSON body fields
//! - Provide the status-keyed taxonomy constructors
//! - Render the client-facing JSON body, hiding detail of unhandled errors

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, WWW_AUTHENTICATE};
use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use super::sanitize::{sanitize_status_code, sanitize_status_text};

/// Name reported for every HTTP error, and the message shown to clients for
/// unhandled errors.
pub const HTTP_ERROR_NAME: &str = "HTTPError";

#[derive(Debug, Clone)]
pub struct HttpError {
    status: StatusCode,
    status_text: Option<String>,
    message: Option<String>,
    data: Option<Value>,
    body: Option<Map<String, Value>>,
    unhandled: bool,
    headers: Option<HeaderMap>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
    backtrace: Option<Arc<Backtrace>>,
}

impl HttpError {
    /// A `500` error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            status_text: None,
            message: Some(message.into()),
            data: None,
            body: None,
            unhandled: false,
            headers: None,
            cause: None,
            backtrace: None,
        }
    }

    /// An error with the given status and optional status text.
    pub fn from_status(status: u16, status_text: Option<&str>) -> Self {
        let mut error = Self::new(String::new()).with_status(status);
        error.message = None;
        if let Some(text) = status_text {
            error = error.with_status_text(text);
        }
        error
    }

    /// Wrap an error that the application did not handle.
    pub(crate) fn unhandled_from(
        source: Arc<dyn StdError + Send + Sync>,
        backtrace: Arc<Backtrace>,
    ) -> Self {
        let mut error = Self::new(source.to_string());
        error.unhandled = true;
        error.cause = Some(source);
        error.backtrace = Some(backtrace);
        error
    }

    pub(crate) fn bad_gateway_from(source: Arc<dyn StdError + Send + Sync>) -> Self {
        let mut error =
            Self::from_status(502, Some("Bad Gateway")).with_message("Upstream request failed");
        error.cause = Some(source);
        error
    }

    // --- taxonomy ---

    /// `400`, with the validation issues under `data.issues`.
    pub fn validation(issues: Value) -> Self {
        Self::from_status(400, Some("Validation Error"))
            .with_message("Validation failed")
            .with_data(json!({ "issues": issues }))
    }

    /// `401`, asking the client to authenticate.
    pub fn authentication_required(realm: &str) -> Self {
        let challenge = format!("Basic realm=\"{}\"", sanitize_status_text(realm).replace('"', ""));
        let mut error = Self::from_status(401, Some("Unauthorized"))
            .with_message("Authentication required");
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            error = error.with_header(WWW_AUTHENTICATE, value);
        }
        error
    }

    /// `404` with the given message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_status(404, None).with_message(message)
    }

    /// `405`.
    pub fn method_not_allowed() -> Self {
        Self::from_status(405, Some("Method Not Allowed"))
    }

    /// `413`.
    pub fn payload_too_large(limit: usize) -> Self {
        Self::from_status(413, Some("Payload Too Large"))
            .with_message(format!("Request body exceeds the limit of {limit} bytes"))
    }

    /// `502`, wrapping the upstream failure.
    pub fn bad_gateway<E>(cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_status(502, Some("Bad Gateway"))
            .with_message("Upstream request failed")
            .with_cause(cause)
    }

    // --- builders ---

    /// Set the status; values outside `[100, 599]` become `500`.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = sanitize_status_code(status, StatusCode::INTERNAL_SERVER_ERROR);
        self
    }

    pub fn with_status_text(mut self, text: &str) -> Self {
        let text = sanitize_status_text(text);
        self.status_text = (!text.is_empty()).then_some(text);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Extra top-level fields for the JSON body.
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .append(name, value);
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn with_unhandled(mut self, unhandled: bool) -> Self {
        self.unhandled = unhandled;
        self
    }

    // --- accessors ---

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    /// The message, defaulting to the status text or `HTTPError <status>`.
    pub fn message(&self) -> String {
        match (&self.message, &self.status_text) {
            (Some(message), _) if !message.is_empty() => message.clone(),
            (_, Some(text)) => text.clone(),
            _ => format!("{HTTP_ERROR_NAME} {}", self.status.as_u16()),
        }
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref()
    }

    pub fn is_unhandled(&self) -> bool {
        self.unhandled
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Check whether `err`, or any error in its source chain, is an HTTP error.
    ///
    /// Errors are recognized by their `HTTPError <status>:` display tag, so an
    /// error wrapped by another type or built by another copy of this crate counts.
    pub fn is_error(err: &(dyn StdError + 'static)) -> bool {
        chain(err).any(|e| parse_tag(&e.to_string()).is_some())
    }

    /// The first HTTP error in the source chain of `err`.
    ///
    /// A link that carries the tag but is not this crate's type is rebuilt
    /// from its status and message.
    pub(crate) fn find_in(err: &(dyn StdError + 'static)) -> Option<Self> {
        let (index, display) = chain(err)
            .map(|e| e.to_string())
            .enumerate()
            .find(|(_, display)| parse_tag(display).is_some())?;
        if let Some(typed) = chain(err).skip(index).find_map(|e| e.downcast_ref::<Self>()) {
            return Some(typed.clone());
        }
        let (status, message) = parse_tag(&display)?;
        let mut error = Self::from_status(status, None);
        if message != format!("{HTTP_ERROR_NAME} {status}") {
            error = error.with_message(message);
        }
        Some(error)
    }

    /// Client-facing JSON body.
    ///
    /// Unhandled errors report a generic message and omit `data` and `body`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("status".into(), json!(self.status.as_u16()));
        if let Some(text) = &self.status_text {
            map.insert("statusText".into(), json!(text));
        }
        if self.unhandled {
            map.insert("unhandled".into(), json!(true));
            map.insert("message".into(), json!(HTTP_ERROR_NAME));
            return Value::Object(map);
        }
        map.insert("message".into(), json!(self.message()));
        if let Some(data) = &self.data {
            map.insert("data".into(), data.clone());
        }
        if let Some(body) = &self.body {
            for (key, value) in body {
                map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map)
    }

    /// Trimmed stack lines: the error, its causes, and a captured backtrace.
    pub fn stack(&self) -> Vec<String> {
        let mut lines = vec![format!("{HTTP_ERROR_NAME}: {}", self.message())];

        let mut source = StdError::source(self);
        while let Some(err) = source {
            lines.push(format!("Caused by: {err}"));
            source = err.source();
        }

        if let Some(backtrace) = &self.backtrace {
            if backtrace.status() == BacktraceStatus::Captured {
                lines.extend(
                    backtrace
                        .to_string()
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                );
            }
        }
        lines
    }
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Split `HTTPError <status>: <message>` into its parts.
fn parse_tag(display: &str) -> Option<(u16, &str)> {
    let rest = display.strip_prefix(HTTP_ERROR_NAME)?.strip_prefix(' ')?;
    let (status, message) = rest.split_once(": ")?;
    Some((status.parse().ok()?, message))
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{HTTP_ERROR_NAME} {}: {}", self.status.as_u16(), self.message())
    }
}

impl StdError for HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_sanitized() {
        assert_eq!(HttpError::new("x").with_status(42).status().as_u16(), 500);
        assert_eq!(HttpError::from_status(418, None).status().as_u16(), 418);
    }

    #[test]
    fn test_message_fallbacks() {
        assert_eq!(HttpError::from_status(418, Some("I'm a teapot")).message(), "I'm a teapot");
        assert_eq!(HttpError::from_status(404, None).message(), "HTTPError 404");
        assert_eq!(HttpError::not_found("gone").message(), "gone");
    }

    #[test]
    fn test_to_json_includes_detail_when_handled() {
        let mut extra = Map::new();
        extra.insert("code".into(), json!("E_TEAPOT"));
        let error = HttpError::from_status(418, Some("Teapot"))
            .with_message("short and stout")
            .with_data(json!({ "cups": 2 }))
            .with_body(extra);

        assert_eq!(
            error.to_json(),
            json!({
                "status": 418,
                "statusText": "Teapot",
                "message": "short and stout",
                "data": { "cups": 2 },
                "code": "E_TEAPOT",
            })
        );
    }

    #[test]
    fn test_to_json_hides_unhandled_detail() {
        let error = HttpError::new("secret").with_data(json!(1)).with_unhandled(true);
        assert_eq!(
            error.to_json(),
            json!({ "status": 500, "unhandled": true, "message": "HTTPError" })
        );
    }

    #[test]
    fn test_validation_error_carries_issues() {
        let error = HttpError::validation(json!([{ "path": "name" }]));
        assert_eq!(error.status().as_u16(), 400);
        assert_eq!(error.data().unwrap()["issues"][0]["path"], "name");
    }

    #[test]
    fn test_is_error_walks_sources() {
        let inner = HttpError::not_found("x");
        let outer = HttpError::bad_gateway(inner.clone());
        assert!(HttpError::is_error(&inner));
        assert!(HttpError::is_error(&outer));
        let io = std::io::Error::other("io");
        assert!(!HttpError::is_error(&io));
    }

    #[test]
    fn test_wrapped_error_is_found() {
        let wrapped = std::io::Error::other(HttpError::from_status(418, None).with_message("short"));
        assert!(HttpError::is_error(&wrapped));

        let found = HttpError::find_in(&wrapped).unwrap();
        assert_eq!(found.status().as_u16(), 418);
        assert_eq!(found.message(), "short");
        assert!(!found.is_unhandled());

        let bare = std::io::Error::other(HttpError::from_status(409, None));
        assert_eq!(HttpError::find_in(&bare).unwrap().message(), "HTTPError 409");
    }

    #[test]
    fn test_tag_needs_status() {
        assert_eq!(parse_tag("HTTPError 404: gone"), Some((404, "gone")));
        assert_eq!(parse_tag("HTTPError: gone"), None);
        assert_eq!(parse_tag("HTTPErrors 404: gone"), None);
    }

    #[test]
    fn test_stack_lists_causes() {
        let error = HttpError::bad_gateway(std::io::Error::other("connection refused"));
        let stack = error.stack();
        assert_eq!(stack[0], "HTTPError: Upstream request failed");
        assert_eq!(stack[1], "Caused by: connection refused");
    }
}
