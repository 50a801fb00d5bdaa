//! Embedding an App or a fetch target under a base path.
//!
//! # Data Flow
//! ```text
//! GET /api/ping, mount("/api", sub)
//!     → outer global middleware
//!     → MountedChain (pathname "/ping")
//!          → sub middleware
//!          → Resume (pathname "/api/ping") → outer next
//!     → pathname restored to "/api/ping"
//!     → route "/api/ping" (re-registered sub route)
//! ```

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::event::Event;
use crate::handler::chain::{execute, Chain};
use crate::handler::{Fetch, Handler, HandlerKind, Middleware, MiddlewareEntry, Next, Outcome};
use crate::routing::matcher::PrefixMatcher;
use crate::routing::{join_paths, normalize_base, without_base, MethodMatch};

use super::dispatcher::{App, RegistrationError};
use super::route::Route;

/// What can be mounted.
pub enum MountTarget {
    App(App),
    Fetch(Arc<dyn Fetch>),
}

impl MountTarget {
    pub fn fetch(target: impl Fetch + 'static) -> Self {
        MountTarget::Fetch(Arc::new(target))
    }
}

impl From<App> for MountTarget {
    fn from(app: App) -> Self {
        MountTarget::App(app)
    }
}

impl App {
    /// Mount `target` under `base`. A missing leading slash is added.
    ///
    /// An App's routes are re-registered under `base` and its middleware runs
    /// as one step for pathnames under `base`. Its own hooks are not carried over.
    /// A fetch target receives every method below `base/**`.
    pub fn mount(
        &mut self,
        base: &str,
        target: impl Into<MountTarget>,
    ) -> Result<&mut Self, RegistrationError> {
        self.ensure_open()?;
        let base = normalize_base(base);

        match target.into() {
            MountTarget::App(app) => self.mount_app(&base, app)?,
            MountTarget::Fetch(target) => {
                let route = Route {
                    method: MethodMatch::Any,
                    pattern: join_paths(&base, "/**"),
                    handler: HandlerKind::fetchable_shared(&base, target),
                    middleware: Vec::new(),
                    meta: Default::default(),
                };
                self.insert_route(Arc::new(route))?;
            }
        }

        tracing::debug!(base = %base, "Mounted");
        Ok(self)
    }

    fn mount_app(&mut self, base: &str, app: App) -> Result<(), RegistrationError> {
        for route in app.routes() {
            let mounted = Route {
                method: route.method.clone(),
                pattern: join_paths(base, &route.pattern),
                handler: route.handler.clone(),
                middleware: route.middleware.clone(),
                meta: route.meta.clone(),
            };
            self.insert_route(Arc::new(mounted))?;
        }

        if !app.middleware.is_empty() {
            let chain = MountedChain {
                base: base.to_string(),
                middleware: app.middleware,
            };
            let entry = MiddlewareEntry::new(chain).with_matcher(Box::new(PrefixMatcher::new(base)));
            self.push_middleware(entry)?;
        }
        Ok(())
    }
}

/// A mounted App's middleware, run as one outer middleware.
struct MountedChain {
    base: String,
    middleware: Vec<Arc<MiddlewareEntry>>,
}

impl Middleware for MountedChain {
    fn call<'a>(&'a self, event: &'a mut Event, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let original = event.pathname().to_string();
            let relative = without_base(&original, &self.base);
            event.set_pathname(&relative);

            let resume = Resume {
                original: &original,
                relative: &relative,
                next: &next,
            };
            let outcome = execute(event, Chain::single(&self.middleware), 0, &resume).await;

            event.set_pathname(&original);
            outcome
        })
    }
}

/// Terminal of a mounted chain: continue the outer chain on the original path.
struct Resume<'n> {
    original: &'n str,
    relative: &'n str,
    next: &'n Next<'n>,
}

impl Handler for Resume<'_> {
    fn call<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            event.set_pathname(self.original);
            let outcome = self.next.run(event).await;
            event.set_pathname(self.relative);
            outcome
        })
    }
}
