//! switchyard: an HTTP request-dispatch core.
//!
//! An [`App`] owns a route table and a middleware list. `App::fetch` turns a
//! [`Request`] into a per-request [`Event`], runs global middleware, route
//! middleware and the matched handler as one continuation chain, and
//! normalizes whatever the chain produced into a [`Response`].
//!
//! ```text
//! Request → Event → chain(global ++ route) → handler | NotFound
//!         → Reply / Error → normalize → Response
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod normalize;
pub mod observability;
pub mod routing;
pub mod utils;

pub use app::{App, MiddlewareOptions, MountTarget, RegistrationError, Resolved, RouteOptions};
pub use config::AppConfig;
pub use error::{Error, HttpError};
pub use event::Event;
pub use handler::{from_fn, handler_fn, sync_handler, HandlerKind, Next, Outcome, Reply};
pub use http::{Body, HttpServer, Request, Response};
pub use lifecycle::Shutdown;
