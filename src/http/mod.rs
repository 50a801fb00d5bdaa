//! HTTP primitives and the runtime adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum adapter: native request → Request)
//!     → App::fetch (dispatch + normalize)
//!     → server.rs (Response → native response)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - `Request`/`Response` are transport-neutral, Fetch-shaped values
//! - Header writes use one rule everywhere (see headers.rs)

pub mod body;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use body::{Body, BodyError};
pub use request::{Request, RequestError};
pub use response::Response;
pub use server::HttpServer;
