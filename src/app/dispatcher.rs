//! The application object: registration and per-request dispatch.

use std::sync::Arc;
use std::time::Instant;

use axum::http::Method;
use futures_util::future::BoxFuture;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::HttpError;
use crate::event::Event;
use crate::handler::chain::{execute, Chain};
use crate::handler::{Handler, HandlerKind, Middleware, MiddlewareEntry, Outcome, Reply};
use crate::http::{Request, Response};
use crate::normalize;
use crate::observability::metrics;
use crate::routing::matcher::{AndMatcher, MethodMatcher, RouteMatcher};
use crate::routing::{MethodMatch, Pattern, PatternError, RouteTable};

use super::route::{MiddlewareOptions, Route, RouteOptions};

/// Errors raised by registration methods.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("registration is closed: routes and middleware cannot be added after startup")]
    Closed,

    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
}

/// Owns the global middleware list and the route table.
///
/// Built mutably, then shared as `Arc<App>` while serving.
pub struct App {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) middleware: Vec<Arc<MiddlewareEntry>>,
    pub(crate) routes: RouteTable<Arc<Route>>,
    closed: bool,
}

/// Terminal used when no route matched.
struct NotFoundTerminal;

impl Handler for NotFoundTerminal {
    fn call<'a>(&'a self, _event: &'a mut Event) -> BoxFuture<'a, Outcome> {
        Box::pin(std::future::ready(Ok(Reply::NotFound)))
    }
}

macro_rules! method_shorthands {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            pub fn $name(
                &mut self,
                pattern: &str,
                handler: HandlerKind,
            ) -> Result<&mut Self, RegistrationError> {
                self.on(Method::$method, pattern, handler, RouteOptions::default())
            }
        )*
    };
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            middleware: Vec::new(),
            routes: RouteTable::new(),
            closed: false,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registered routes, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter().map(|(_, _, route)| route)
    }

    /// Number of global middleware entries.
    pub fn middleware_len(&self) -> usize {
        self.middleware.len()
    }

    /// Reject every later registration.
    pub fn close_registration(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn ensure_open(&self) -> Result<(), RegistrationError> {
        if self.closed {
            Err(RegistrationError::Closed)
        } else {
            Ok(())
        }
    }

    // --- registration ---

    /// Register a route. `MethodMatch::Any` matches every method.
    pub fn on(
        &mut self,
        method: impl Into<MethodMatch>,
        pattern: &str,
        handler: HandlerKind,
        options: RouteOptions,
    ) -> Result<&mut Self, RegistrationError> {
        self.ensure_open()?;
        let method = method.into();
        let route = Route {
            method: method.clone(),
            pattern: pattern.to_string(),
            handler,
            middleware: options.middleware,
            meta: options.meta,
        };
        self.insert_route(Arc::new(route))?;
        debug!(method = %method, pattern = %pattern, "Route registered");
        Ok(self)
    }

    pub(crate) fn insert_route(&mut self, route: Arc<Route>) -> Result<(), RegistrationError> {
        let method = route.method.clone();
        let pattern = route.pattern.clone();
        self.routes.insert(method, &pattern, route)?;
        Ok(())
    }

    method_shorthands! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
        connect => CONNECT,
        trace => TRACE,
    }

    /// Register a route for every method.
    pub fn all(&mut self, pattern: &str, handler: HandlerKind) -> Result<&mut Self, RegistrationError> {
        self.on(MethodMatch::Any, pattern, handler, RouteOptions::default())
    }

    /// Append a global middleware.
    pub fn use_middleware(
        &mut self,
        middleware: impl Middleware + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        self.push_middleware(MiddlewareEntry::new(middleware))
    }

    /// Append a global middleware that only runs for pathnames matching `pattern`.
    pub fn use_at(
        &mut self,
        pattern: &str,
        middleware: impl Middleware + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        self.use_with(middleware, MiddlewareOptions::new().route(pattern))
    }

    /// Append a global middleware guarded by route, method and custom predicates.
    pub fn use_with(
        &mut self,
        middleware: impl Middleware + 'static,
        options: MiddlewareOptions,
    ) -> Result<&mut Self, RegistrationError> {
        self.ensure_open()?;
        let mut predicate = AndMatcher::default();
        if let Some(pattern) = &options.route {
            predicate.push(Box::new(RouteMatcher::new(Pattern::parse(pattern)?)));
        }
        if let Some(method) = options.method {
            predicate.push(Box::new(MethodMatcher::new(method)));
        }
        if let Some(matcher) = options.matcher {
            predicate.push(matcher);
        }

        let mut entry = MiddlewareEntry::new(middleware);
        if let Some(matcher) = predicate.simplify() {
            entry = entry.with_matcher(matcher);
        }
        self.push_middleware(entry)
    }

    pub(crate) fn push_middleware(
        &mut self,
        entry: MiddlewareEntry,
    ) -> Result<&mut Self, RegistrationError> {
        self.ensure_open()?;
        self.middleware.push(Arc::new(entry));
        Ok(self)
    }

    // --- dispatch ---

    /// Run the chain for an event and return its raw outcome.
    pub fn handle<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let matched = self
                .routes
                .find(event.method(), event.pathname())
                .map(|found| (Arc::clone(found.data), found.params));

            match matched {
                Some((route, params)) => {
                    debug!(route = %route.pattern, path = %event.pathname(), "Route matched");
                    event.context.params.extend(params);
                    event.context.matched_route = Some(Arc::clone(&route));
                    let chain = Chain::new(&self.middleware, &route.middleware);
                    execute(event, chain, 0, &route.handler).await
                }
                None => {
                    debug!(path = %event.pathname(), "No route matched");
                    execute(event, Chain::single(&self.middleware), 0, &NotFoundTerminal).await
                }
            }
        })
    }

    /// Dispatch a request and normalize the result into a response.
    pub async fn fetch(&self, request: Request) -> Response {
        let started = Instant::now();
        let mut event = Event::new(request);

        let prelude = match self.config.on_request() {
            Some(hook) => hook(&mut event).await,
            None => Ok(()),
        };
        let outcome = match prelude {
            Ok(()) => self.handle(&mut event).await,
            Err(error) => Err(error),
        };

        let mut response = normalize::to_response(outcome, &mut event, &self.config).await;

        if let Some(hook) = self.config.on_response() {
            let replacement = hook(&response, &mut event).await;
            if let Some(replacement) = replacement {
                response = replacement;
            }
        }

        metrics::record_request(event.method(), response.status().as_u16(), started);
        debug!(
            method = %event.method(),
            path = %event.req().url().path(),
            status = response.status().as_u16(),
            "Request dispatched"
        );
        response
    }

    /// Dispatch `method` against a path or absolute URL.
    ///
    /// An unparsable input yields a `400` response.
    pub async fn request(&self, method: Method, input: &str) -> Response {
        match Request::new(method.clone(), input) {
            Ok(request) => self.fetch(request).await,
            Err(error) => {
                let error = HttpError::from_status(400, None).with_message(error.to_string());
                normalize::strip_null_body(normalize::error_response(&error, &self.config), &method)
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("middleware", &self.middleware.len())
            .field("routes", &self.routes.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::sync_handler;

    #[test]
    fn test_registration_closed() {
        let mut app = App::new();
        app.get("/", sync_handler(|_| Ok("ok"))).unwrap();
        app.close_registration();

        let err = app.get("/late", sync_handler(|_| Ok("late"))).unwrap_err();
        assert_eq!(err, RegistrationError::Closed);
        assert_eq!(app.routes().count(), 1);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut app = App::new();
        let err = app.get("/a/**/b", sync_handler(|_| Ok(()))).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn test_handle_returns_raw_outcome() {
        let mut app = App::new();
        app.get("/id/:id", sync_handler(|event| Ok(event.param("id").unwrap_or_default().to_string())))
            .unwrap();

        let mut event = Event::new(Request::new(Method::GET, "/id/42").unwrap());
        let outcome = app.handle(&mut event).await.unwrap();
        assert!(matches!(outcome, Reply::Text(ref text) if text == "42"));
        assert_eq!(event.context.matched_route.as_ref().unwrap().pattern(), "/id/:id");

        let mut event = Event::new(Request::new(Method::GET, "/nope").unwrap());
        assert!(matches!(app.handle(&mut event).await, Ok(Reply::NotFound)));
    }
}
