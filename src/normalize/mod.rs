//! Response and error normalization.
//!
//! # Data Flow
//! ```text
//! Outcome (raw chain result)
//!     → Handled  → empty response
//!     → NotFound → HttpError 404 ─┐
//!     → Err(e)   → HttpError ─────┤
//!                                 ├→ log (unhandled, not silent)
//!                                 ├→ on_error hook (once) → replacement Outcome
//!                                 └→ errors.rs (JSON error response) → null-body rule
//!     → Ok(reply) → body.rs (body dispatch) → merge event.res → null-body rule
//!     → Response
//! ```
//!
//! # Design Decisions
//! - The hook retry is a loop with a `nested` flag, so `on_error` runs at most once
//! - A value returned by the hook is normalized like any other value

mod body;
mod errors;

use crate::config::AppConfig;
use crate::error::HttpError;
use crate::event::Event;
use crate::handler::{Outcome, Reply};
use crate::http::Response;

pub use body::{is_null_body_status, JSON_CONTENT_TYPE};
pub(crate) use body::strip_null_body;
pub use errors::error_response;

/// Turn a chain result into a concrete [`Response`].
pub async fn to_response(outcome: Outcome, event: &mut Event, config: &AppConfig) -> Response {
    let mut outcome = outcome;
    let mut nested = false;

    loop {
        let error = match outcome {
            Ok(Reply::Handled) => return Response::empty(),
            Ok(Reply::NotFound) => HttpError::not_found(format!(
                "Cannot find any route matching [{}] {}",
                event.method(),
                event.path()
            )),
            Ok(reply) => return body::reply_response(reply, event, config),
            Err(error) => error.into_http(),
        };

        if error.is_unhandled() && !config.silent() {
            errors::log_unhandled(&error, event);
        }

        if let Some(hook) = config.on_error().filter(|_| !nested) {
            nested = true;
            match hook(&error, event).await {
                Ok(Some(replacement)) => {
                    outcome = Ok(replacement);
                    continue;
                }
                Ok(None) => {}
                Err(failure) => {
                    outcome = Err(failure);
                    continue;
                }
            }
        }

        return strip_null_body(errors::error_response(&error, config), event.method());
    }
}
