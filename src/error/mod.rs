//! Error handling subsystem.
//!
//! # Data Flow
//! ```text
//! handler / middleware returns Err(e)
//!     → propagates through every chain frame untouched
//!     → (optional) middleware catches around its own next()
//!     → normalizer: classify → log → on_error hook → JSON error body
//! ```
//!
//! # Design Decisions
//! - `Error` does not implement `std::error::Error`, so any std error converts with `?`
//! - Classification happens once, at conversion: an error whose source chain
//!   carries the `HTTPError` display tag becomes `Http`, everything else becomes
//!   `Unhandled` together with a captured backtrace
//! - `Error` is cheap to clone so a memoized chain result can be shared

pub mod http_error;
pub mod sanitize;

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

pub use http_error::{HttpError, HTTP_ERROR_NAME};

/// The error type flowing through handlers, middleware and hooks.
#[derive(Clone)]
pub struct Error {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Http(Box<HttpError>),
    Unhandled {
        source: Arc<dyn StdError + Send + Sync>,
        backtrace: Arc<Backtrace>,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageError(String);

impl Error {
    /// An unhandled error carrying only a message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::unhandled(Box::new(MessageError(message.to_string())))
    }

    pub fn http(error: HttpError) -> Self {
        Self {
            repr: Repr::Http(Box::new(error)),
        }
    }

    fn unhandled(source: Box<dyn StdError + Send + Sync>) -> Self {
        Self {
            repr: Repr::Unhandled {
                source: Arc::from(source),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }

    /// Returns true if the error is part of the HTTP taxonomy.
    pub fn is_http(&self) -> bool {
        matches!(self.repr, Repr::Http(_))
    }

    pub fn as_http(&self) -> Option<&HttpError> {
        match &self.repr {
            Repr::Http(error) => Some(error),
            Repr::Unhandled { .. } => None,
        }
    }

    /// The underlying std error.
    pub fn source_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match &self.repr {
            Repr::Http(error) => &**error,
            Repr::Unhandled { source, .. } => &**source,
        }
    }

    /// Classify into the HTTP taxonomy. Anything not already an `HttpError`
    /// becomes a `500` flagged as unhandled, keeping its backtrace.
    pub fn into_http(self) -> HttpError {
        match self.repr {
            Repr::Http(error) => *error,
            Repr::Unhandled { source, backtrace } => HttpError::unhandled_from(source, backtrace),
        }
    }

    /// Like [`Error::into_http`], but a failure outside the taxonomy becomes `502`.
    pub fn into_upstream(self) -> HttpError {
        match self.repr {
            Repr::Http(error) => *error,
            Repr::Unhandled { source, .. } => HttpError::bad_gateway_from(source),
        }
    }
}

impl<E> From<E> for Error
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        match HttpError::find_in(&err) {
            Some(http) => Self::http(http),
            None => Self::unhandled(Box::new(err)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Http(error) => fmt::Display::fmt(error, f),
            Repr::Unhandled { source, .. } => fmt::Display::fmt(source, f),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Http(error) => f.debug_tuple("Http").field(error).finish(),
            Repr::Unhandled { source, .. } => f.debug_tuple("Unhandled").field(source).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_is_classified_on_conversion() {
        let err: Error = HttpError::not_found("nope").into();
        assert!(err.is_http());
        let http = err.into_http();
        assert_eq!(http.status().as_u16(), 404);
        assert!(!http.is_unhandled());
    }

    #[test]
    fn test_other_errors_become_unhandled() {
        let err: Error = std::io::Error::other("disk on fire").into();
        assert!(!err.is_http());
        let http = err.into_http();
        assert_eq!(http.status().as_u16(), 500);
        assert!(http.is_unhandled());
        assert_eq!(http.message(), "disk on fire");
    }

    #[test]
    fn test_wrapped_http_error_stays_handled() {
        let wrapped = std::io::Error::other(HttpError::from_status(418, None).with_message("short"));
        let err: Error = wrapped.into();
        assert!(err.is_http());

        let http = err.into_http();
        assert_eq!(http.status().as_u16(), 418);
        assert!(!http.is_unhandled());
        assert_eq!(http.to_json()["message"], "short");
    }

    #[test]
    fn test_msg() {
        let err = Error::msg("boom");
        assert_eq!(err.to_string(), "boom");
        assert!(err.into_http().is_unhandled());
    }
}
