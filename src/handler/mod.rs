//! Handlers, middleware and the values they produce.
//!
//! # Data Flow
//! ```text
//! Event
//!     → chain.rs (global middleware, then route middleware)
//!     → kind.rs (terminal handler: direct, sub-app or fetch target)
//!     → reply.rs (raw value handed to the normalizer)
//! ```

pub mod chain;
pub mod kind;
pub mod reply;

pub use chain::{from_fn, FromFn, Middleware, MiddlewareEntry, Next};
pub use kind::{handler_fn, sync_handler, Fetch, Handler, HandlerKind, MountedApp};
pub use reply::{Blob, Outcome, PartialResponse, Reply};
