//! Route records and registration options.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::handler::{HandlerKind, Middleware, MiddlewareEntry};
use crate::routing::matcher::Matcher;
use crate::routing::MethodMatch;

/// An immutable `(method, pattern) -> handler` binding.
pub struct Route {
    pub(crate) method: MethodMatch,
    pub(crate) pattern: String,
    pub(crate) handler: HandlerKind,
    pub(crate) middleware: Vec<Arc<MiddlewareEntry>>,
    pub(crate) meta: Map<String, Value>,
}

impl Route {
    pub fn method(&self) -> &MethodMatch {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &HandlerKind {
        &self.handler
    }

    /// Route-scoped middleware, run after the global list.
    pub fn middleware(&self) -> &[Arc<MiddlewareEntry>] {
        &self.middleware
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("handler", &self.handler)
            .field("middleware", &self.middleware.len())
            .field("meta", &self.meta)
            .finish()
    }
}

/// Extra route data given at registration.
#[derive(Default)]
pub struct RouteOptions {
    pub middleware: Vec<Arc<MiddlewareEntry>>,
    pub meta: Map<String, Value>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(MiddlewareEntry::new(middleware)));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Predicates for a global middleware. All given conditions must hold.
#[derive(Debug, Default)]
pub struct MiddlewareOptions {
    pub route: Option<String>,
    pub method: Option<axum::http::Method>,
    pub matcher: Option<Box<dyn Matcher>>,
}

impl MiddlewareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: impl Into<String>) -> Self {
        self.route = Some(pattern.into());
        self
    }

    pub fn method(mut self, method: axum::http::Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn matcher(mut self, matcher: impl Matcher + 'static) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }
}
