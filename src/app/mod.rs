//! Dispatcher subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     on / get / post / ... → Route → RouteTable
//!     use_middleware / use_at / use_with → MiddlewareEntry → global list
//!     mount(base, App | fetch target) → re-registered routes (+ MountedChain)
//!
//! Per request:
//!     App::fetch(Request)
//!         → on_request hook
//!         → App::handle(event): lookup → context.params → chain(global ++ route)
//!         → normalize::to_response
//!         → on_response hook
//!         → Response
//! ```
//!
//! # Design Decisions
//! - Route table and middleware are read-only once requests are served
//! - Closing registration is an explicit flag checked by every registration method
//! - `resolve` never runs middleware or handlers

mod dispatcher;
mod mount;
mod resolve;
mod route;

pub use dispatcher::{App, RegistrationError};
pub use mount::MountTarget;
pub use resolve::{Resolved, MAX_RESOLVE_DEPTH};
pub use route::{MiddlewareOptions, Route, RouteOptions};
