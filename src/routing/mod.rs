//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before requests are served):
//!     (method, pattern string, data)
//!     → pattern.rs (compile into segments)
//!     → router.rs (append to the route table)
//!
//! Lookup (per request):
//!     (method, pathname)
//!     → router.rs (best match by specificity, then method, then order)
//!     → Return: route data + extracted params, or None
//!
//! Middleware predicates:
//!     Event → matcher.rs (method / route / prefix / custom) → bool
//! ```
//!
//! # Design Decisions
//! - Patterns are compiled once at registration
//! - No regex in the hot path
//! - Deterministic: same table and input always match the same route

pub mod matcher;
pub mod pattern;
pub mod router;

pub use matcher::{AndMatcher, FnMatcher, Matcher, MethodMatcher, PrefixMatcher, RouteMatcher};
pub use pattern::{
    is_under_base, join_paths, normalize_base, without_base, Params, Pattern, PatternError,
};
pub use router::{MethodMatch, RouteMatch, RouteTable};
