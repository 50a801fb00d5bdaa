//! The outgoing response shell written imperatively by middleware and handlers.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;

use crate::error::sanitize::sanitize_status_text;
use crate::http::headers::set_header;

/// Status and headers prepared before the final response exists.
///
/// Headers are allocated on first write.
#[derive(Debug, Clone, Default)]
pub struct EventResponse {
    status: Option<StatusCode>,
    status_text: Option<String>,
    headers: Option<HeaderMap>,
}

impl EventResponse {
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    pub fn set_status_text(&mut self, text: &str) {
        self.status_text = Some(sanitize_status_text(text));
    }

    /// Headers written so far, `None` if nothing was written.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.headers.get_or_insert_with(HeaderMap::new)
    }

    /// Overwrite a header (`set-cookie` appends instead).
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        set_header(self.headers_mut(), name, value);
    }

    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().append(name, value);
    }

    pub fn remove_header(&mut self, name: &HeaderName) {
        if let Some(headers) = self.headers.as_mut() {
            headers.remove(name);
        }
    }
}
