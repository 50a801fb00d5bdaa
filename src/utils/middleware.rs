//! Middleware built from lifecycle callbacks.

use futures_util::future::BoxFuture;

use crate::error::{Error, HttpError};
use crate::event::Event;
use crate::handler::{Middleware, Next, Outcome, Reply};

/// Run `hook` before the rest of the chain. An error stops the chain.
pub fn on_request<F>(hook: F) -> impl Middleware
where
    F: for<'a> Fn(&'a mut Event) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
{
    OnRequest(hook)
}

struct OnRequest<F>(F);

impl<F> Middleware for OnRequest<F>
where
    F: for<'a> Fn(&'a mut Event) -> BoxFuture<'a, Result<(), Error>> + Send + Sync,
{
    fn call<'a>(&'a self, event: &'a mut Event, _next: Next<'a>) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            (self.0)(event).await?;
            Ok(Reply::Continue)
        })
    }
}

/// Show the raw downstream value to `hook`; `Some` replaces it.
///
/// Errors pass through untouched and the value is not normalized here, so a
/// `NotFound` fallthrough still reaches the App's error handling.
pub fn on_response<F>(hook: F) -> impl Middleware
where
    F: for<'a> Fn(&'a Reply, &'a mut Event) -> BoxFuture<'a, Option<Reply>>
        + Send
        + Sync
        + 'static,
{
    OnResponse(hook)
}

struct OnResponse<F>(F);

impl<F> Middleware for OnResponse<F>
where
    F: for<'a> Fn(&'a Reply, &'a mut Event) -> BoxFuture<'a, Option<Reply>> + Send + Sync,
{
    fn call<'a>(&'a self, event: &'a mut Event, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let reply = next.run(event).await?;
            let replacement = (self.0)(&reply, event).await;
            Ok(replacement.unwrap_or(reply))
        })
    }
}

/// Catch a downstream error. `Some` replaces it, `None` rethrows it.
pub fn on_error<F>(hook: F) -> impl Middleware
where
    F: for<'a> Fn(&'a HttpError, &'a mut Event) -> BoxFuture<'a, Result<Option<Reply>, Error>>
        + Send
        + Sync
        + 'static,
{
    OnError(hook)
}

struct OnError<F>(F);

impl<F> Middleware for OnError<F>
where
    F: for<'a> Fn(&'a HttpError, &'a mut Event) -> BoxFuture<'a, Result<Option<Reply>, Error>>
        + Send
        + Sync,
{
    fn call<'a>(&'a self, event: &'a mut Event, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            match next.run(event).await {
                Err(error) => {
                    let http = error.clone().into_http();
                    match (self.0)(&http, event).await? {
                        Some(reply) => Ok(reply),
                        None => Err(error),
                    }
                }
                ok => ok,
            }
        })
    }
}
