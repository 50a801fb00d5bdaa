//! Status code and status text sanitizing.

use axum::http::StatusCode;

/// Keep only horizontal tabs, spaces and visible ASCII (RFC 7230 §3.1.2).
pub fn sanitize_status_text(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\t' || (' '..='~').contains(c))
        .collect()
}

/// Clamp a numeric status into `[100, 599]`, falling back to `default`.
pub fn sanitize_status_code(code: u16, default: StatusCode) -> StatusCode {
    if !(100..=599).contains(&code) {
        return default;
    }
    StatusCode::from_u16(code).unwrap_or(default)
}
