//! Middleware chain executor.
//!
//! # Responsibilities
//! - Run middleware in order, then the terminal handler
//! - Skip middleware whose predicate rejects the event (the body never runs)
//! - Short-circuit on any value other than `Continue`/`NotFound`
//! - Propagate errors through every frame
//!
//! # Design Decisions
//! - Continuation passing: each middleware gets a `Next` for the rest of the chain
//! - `Next::run` is memoized; a second call returns the first result without
//!   running downstream again
//! - Returning `Continue` is the same as returning the result of `next.run`

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::event::Event;
use crate::routing::matcher::Matcher;

use super::kind::Handler;
use super::reply::Outcome;

/// A chain step taking the event and the continuation.
pub trait Middleware: Send + Sync {
    fn call<'a>(&'a self, event: &'a mut Event, next: Next<'a>) -> BoxFuture<'a, Outcome>;
}

/// Async closure middleware, see [`from_fn`].
pub struct FromFn<F>(F);

impl<F> Middleware for FromFn<F>
where
    F: for<'a> Fn(&'a mut Event, Next<'a>) -> BoxFuture<'a, Outcome> + Send + Sync,
{
    fn call<'a>(&'a self, event: &'a mut Event, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        (self.0)(event, next)
    }
}

/// Build a middleware from an async closure:
/// `from_fn(|event, next| Box::pin(async move { next.run(event).await }))`.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: for<'a> Fn(&'a mut Event, Next<'a>) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    FromFn(f)
}

/// A registered middleware with its optional predicate.
pub struct MiddlewareEntry {
    middleware: Arc<dyn Middleware>,
    matcher: Option<Box<dyn Matcher>>,
}

impl MiddlewareEntry {
    pub fn new(middleware: impl Middleware + 'static) -> Self {
        Self::from_arc(Arc::new(middleware))
    }

    pub fn from_arc(middleware: Arc<dyn Middleware>) -> Self {
        Self {
            middleware,
            matcher: None,
        }
    }

    pub fn with_matcher(mut self, matcher: Box<dyn Matcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Returns true if the middleware should run for this event.
    pub fn applies(&self, event: &Event) -> bool {
        self.matcher
            .as_ref()
            .map_or(true, |matcher| matcher.matches(event))
    }
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareEntry")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

/// An ordered view over global then route-scoped middleware.
#[derive(Clone, Copy)]
pub(crate) struct Chain<'a> {
    global: &'a [Arc<MiddlewareEntry>],
    scoped: &'a [Arc<MiddlewareEntry>],
}

impl<'a> Chain<'a> {
    pub(crate) fn new(global: &'a [Arc<MiddlewareEntry>], scoped: &'a [Arc<MiddlewareEntry>]) -> Self {
        Self { global, scoped }
    }

    pub(crate) fn single(list: &'a [Arc<MiddlewareEntry>]) -> Self {
        Self::new(list, &[])
    }

    fn get(&self, index: usize) -> Option<&'a MiddlewareEntry> {
        match index.checked_sub(self.global.len()) {
            None => self.global.get(index).map(Arc::as_ref),
            Some(scoped) => self.scoped.get(scoped).map(Arc::as_ref),
        }
    }
}

/// Continuation for the rest of the chain.
pub struct Next<'a> {
    chain: Chain<'a>,
    index: usize,
    terminal: &'a (dyn Handler + 'a),
    memo: &'a OnceCell<Outcome>,
}

impl<'a> Next<'a> {
    /// Run the rest of the chain, or return the result of the earlier run.
    pub async fn run(&self, event: &mut Event) -> Outcome {
        self.memo
            .get_or_init(|| execute(event, self.chain, self.index, self.terminal))
            .await
            .clone()
    }

    /// Returns true once the rest of the chain has produced a result.
    pub fn is_called(&self) -> bool {
        self.memo.initialized()
    }
}

/// Run `chain[index..]` followed by `terminal`.
pub(crate) fn execute<'a>(
    event: &'a mut Event,
    chain: Chain<'a>,
    index: usize,
    terminal: &'a (dyn Handler + 'a),
) -> BoxFuture<'a, Outcome> {
    Box::pin(async move {
        let mut index = index;
        loop {
            let Some(entry) = chain.get(index) else {
                return terminal.call(event).await;
            };

            if !entry.applies(event) {
                tracing::trace!(index, path = %event.pathname(), "Middleware skipped");
                index += 1;
                continue;
            }

            let memo = OnceCell::new();
            let outcome = {
                let next = Next {
                    chain,
                    index: index + 1,
                    terminal,
                    memo: &memo,
                };
                entry.middleware.call(event, next).await
            };

            return match outcome {
                Ok(reply) if reply.is_fallthrough() => match memo.into_inner() {
                    Some(downstream) => downstream,
                    None => execute(event, chain, index + 1, terminal).await,
                },
                other => other,
            };
        }
    })
}
