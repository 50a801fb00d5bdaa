//! Per-request event.
//!
//! # Data Flow
//! ```text
//! Request
//!     → Event::new (working URL copied from the request)
//!     → middleware / handler read `req`, `url`, `context`
//!     → middleware / handler write `res_mut()` and `context`
//!     → normalizer merges `res()` into the final Response
//! ```
//!
//! # Design Decisions
//! - One Event per request, exclusively owned by its chain
//! - The working URL is separate from the request so mounts can rewrite the pathname
//! - The response shell is created lazily on first write

pub mod context;
pub mod response;

use std::fmt;

use axum::http::header::HeaderMap;
use axum::http::Method;
use url::Url;

use crate::http::Request;

pub use context::Context;
pub use response::EventResponse;

pub struct Event {
    req: Request,
    url: Url,
    res: Option<EventResponse>,
    pub context: Context,
}

impl Event {
    pub fn new(req: Request) -> Self {
        Self::with_context(req, Context::new())
    }

    pub fn with_context(req: Request, context: Context) -> Self {
        let url = req.url().clone();
        Self {
            req,
            url,
            res: None,
            context,
        }
    }

    pub fn req(&self) -> &Request {
        &self.req
    }

    pub fn method(&self) -> &Method {
        self.req.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.req.headers()
    }

    /// The working URL (pathname may be rewritten inside a mount).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    pub fn set_pathname(&mut self, pathname: &str) {
        self.url.set_path(pathname);
    }

    /// Pathname plus query string.
    pub fn path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_string(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.context.param(name)
    }

    /// The response shell, `None` if nothing was written yet.
    pub fn res(&self) -> Option<&EventResponse> {
        self.res.as_ref()
    }

    pub fn res_mut(&mut self) -> &mut EventResponse {
        self.res.get_or_insert_with(EventResponse::default)
    }

    /// Remove the response shell once it has been folded into a response.
    pub fn take_res(&mut self) -> Option<EventResponse> {
        self.res.take()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.req.method(), self.path())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("method", self.req.method())
            .field("url", &self.url.as_str())
            .field("res", &self.res)
            .field("context", &self.context)
            .finish()
    }
}
