//! Response shell helpers.

use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;

use crate::error::sanitize::sanitize_status_code;
use crate::event::Event;
use crate::handler::Reply;
use crate::http::Response;

/// Set the status (sanitized into 100..=599, default 200) and optional status text.
pub fn set_response_status(event: &mut Event, code: u16, text: Option<&str>) {
    let res = event.res_mut();
    res.set_status(sanitize_status_code(code, StatusCode::OK));
    if let Some(text) = text {
        res.set_status_text(text);
    }
}

/// The status written so far, `200` when none was set.
pub fn get_response_status(event: &Event) -> StatusCode {
    event
        .res()
        .and_then(|res| res.status())
        .unwrap_or(StatusCode::OK)
}

pub fn get_response_status_text(event: &Event) -> Option<&str> {
    event.res().and_then(|res| res.status_text())
}

pub fn set_response_header(event: &mut Event, name: HeaderName, value: HeaderValue) {
    event.res_mut().set_header(name, value);
}

pub fn append_response_header(event: &mut Event, name: HeaderName, value: HeaderValue) {
    event.res_mut().append_header(name, value);
}

pub fn remove_response_header(event: &mut Event, name: &HeaderName) {
    if event.res().is_some() {
        event.res_mut().remove_header(name);
    }
}

/// An empty response, `204` unless another code is given.
pub fn no_content(code: Option<u16>) -> Reply {
    let status = sanitize_status_code(code.unwrap_or(204), StatusCode::NO_CONTENT);
    Reply::Response(Response::empty().with_status(status))
}

/// Redirect to `location`, `302` unless another code is given.
pub fn redirect(location: &str, code: Option<u16>) -> Reply {
    let status = sanitize_status_code(code.unwrap_or(302), StatusCode::FOUND);
    let escaped = location.replace('"', "%22");
    let html = format!(
        "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" content=\"0; url={escaped}\" /></head></html>"
    );

    let mut response = Response::new(html)
        .with_status(status)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    if let Ok(value) = HeaderValue::from_str(location) {
        response = response.with_header(LOCATION, value);
    }
    Reply::Response(response)
}
