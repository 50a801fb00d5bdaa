//! Route handlers and their normalized shapes.
//!
//! # Design Decisions
//! - Handler shape is normalized once at registration into [`HandlerKind`],
//!   never re-inspected per request
//! - `SubApp` rewrites the working pathname for the inner app and restores it after
//! - `Fetchable` hands a rewritten copy of the request to a fetch-shaped target

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::app::App;
use crate::error::Error;
use crate::event::Event;
use crate::http::{Request, Response};
use crate::routing::pattern::{normalize_base, without_base};

use super::reply::{Outcome, Reply};

/// A terminal chain step.
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, Outcome>;
}

/// A fetch-shaped target: takes a request, produces a response.
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, Error>>;
}

impl<F, Fut> Fetch for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, Error>> {
        Box::pin(self(request))
    }
}

/// Async closure handler, see [`handler_fn`].
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Event) -> BoxFuture<'a, Outcome> + Send + Sync,
{
    fn call<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, Outcome> {
        (self.0)(event)
    }
}

/// Synchronous closure handler, see [`sync_handler`].
pub struct SyncHandler<F>(F);

impl<F, R> Handler for SyncHandler<F>
where
    F: Fn(&mut Event) -> Result<R, Error> + Send + Sync,
    R: Into<Reply>,
{
    fn call<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, Outcome> {
        let outcome = (self.0)(event).map(Into::into);
        Box::pin(std::future::ready(outcome))
    }
}

/// Wrap an async closure: `handler_fn(|event| Box::pin(async move { ... }))`.
pub fn handler_fn<F>(f: F) -> HandlerKind
where
    F: for<'a> Fn(&'a mut Event) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    HandlerKind::Direct(Arc::new(HandlerFn(f)))
}

/// Wrap a synchronous closure returning anything convertible into a [`Reply`].
pub fn sync_handler<F, R>(f: F) -> HandlerKind
where
    F: Fn(&mut Event) -> Result<R, Error> + Send + Sync + 'static,
    R: Into<Reply> + 'static,
{
    HandlerKind::Direct(Arc::new(SyncHandler(f)))
}

/// An app serving below a base path.
pub struct MountedApp {
    pub(crate) base: String,
    pub(crate) app: App,
}

impl MountedApp {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}

/// A fetch target serving below a base path.
pub struct FetchTarget {
    pub(crate) base: String,
    pub(crate) target: Arc<dyn Fetch>,
}

/// The normalized handler shape stored on a route.
#[derive(Clone)]
pub enum HandlerKind {
    Direct(Arc<dyn Handler>),
    SubApp(Arc<MountedApp>),
    Fetchable(Arc<FetchTarget>),
}

impl HandlerKind {
    pub fn direct(handler: impl Handler + 'static) -> Self {
        HandlerKind::Direct(Arc::new(handler))
    }

    /// Serve `app` with `base` stripped from the pathname.
    pub fn sub_app(base: &str, app: App) -> Self {
        HandlerKind::SubApp(Arc::new(MountedApp {
            base: normalize_base(base),
            app,
        }))
    }

    /// Delegate to a fetch target with `base` stripped from the URL.
    pub fn fetchable(base: &str, target: impl Fetch + 'static) -> Self {
        Self::fetchable_shared(base, Arc::new(target))
    }

    pub(crate) fn fetchable_shared(base: &str, target: Arc<dyn Fetch>) -> Self {
        HandlerKind::Fetchable(Arc::new(FetchTarget {
            base: normalize_base(base),
            target,
        }))
    }

    /// Identity of the handler value, shared by clones.
    pub(crate) fn identity(&self) -> *const () {
        match self {
            HandlerKind::Direct(handler) => Arc::as_ptr(handler) as *const (),
            HandlerKind::SubApp(mounted) => Arc::as_ptr(mounted) as *const (),
            HandlerKind::Fetchable(target) => Arc::as_ptr(target) as *const (),
        }
    }

    /// Returns true if both refer to the same handler value.
    pub fn same(&self, other: &HandlerKind) -> bool {
        self.identity() == other.identity()
    }
}

impl Handler for HandlerKind {
    fn call<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, Outcome> {
        match self {
            HandlerKind::Direct(handler) => handler.call(event),
            HandlerKind::SubApp(mounted) => Box::pin(async move {
                let original = event.pathname().to_string();
                event.set_pathname(&without_base(&original, &mounted.base));
                let outcome = mounted.app.handle(event).await;
                event.set_pathname(&original);
                outcome
            }),
            HandlerKind::Fetchable(target) => Box::pin(async move {
                let mut url = event.url().clone();
                url.set_path(&without_base(event.pathname(), &target.base));
                let request = event.req().with_url(url);
                match target.target.fetch(request).await {
                    Ok(response) => Ok(Reply::Response(response)),
                    Err(error) => {
                        tracing::warn!(base = %target.base, error = %error, "Fetch target failed");
                        Err(Error::http(error.into_upstream()))
                    }
                }
            }),
        }
    }
}

impl fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Direct(_) => f.write_str("Direct"),
            HandlerKind::SubApp(mounted) => write!(f, "SubApp({})", mounted.base),
            HandlerKind::Fetchable(target) => write!(f, "Fetchable({})", target.base),
        }
    }
}
