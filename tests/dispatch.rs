//! Dispatcher tests: routing, chain order, short-circuit and NotFound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use switchyard::handler::{from_fn, handler_fn, sync_handler};
use switchyard::routing::{FnMatcher, MethodMatch};
use switchyard::{
    App, AppConfig, Error, HttpError, MiddlewareOptions, Reply, Request, RouteOptions,
};

mod common;

use common::Trail;

fn tracing_middleware(trail: &Trail, name: &'static str) -> impl switchyard::handler::Middleware {
    let trail = trail.clone();
    from_fn(move |event, next| {
        let trail = trail.clone();
        Box::pin(async move {
            trail.push(format!("{name}:{}", event.pathname()));
            next.run(event).await
        })
    })
}

#[tokio::test]
async fn test_param_route() {
    let mut app = App::new();
    app.get(
        "/id/:id",
        sync_handler(|event| Ok(event.param("id").unwrap_or_default().to_string())),
    )
    .unwrap();

    let response = common::get(&app, "/id/42").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::text(response).await, "42");
}

#[tokio::test]
async fn test_short_circuit_skips_handler() {
    let trail = Trail::default();
    let hits = Arc::new(AtomicUsize::new(0));

    let mut app = App::new();
    app.use_middleware(tracing_middleware(&trail, "m1")).unwrap();
    app.use_middleware(from_fn(|_event, _next| Box::pin(async { Ok(Reply::from("short")) })))
        .unwrap();
    let counter = hits.clone();
    app.get(
        "/",
        sync_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("handler")
        }),
    )
    .unwrap();

    let response = common::get(&app, "/").await;
    assert_eq!(common::text(response).await, "short");
    assert_eq!(trail.steps(), vec!["m1:/"]);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_not_found_names_method_and_path() {
    let app = App::new();
    let response = common::get(&app, "/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = common::json(response).await;
    assert_eq!(body["status"], 404);
    assert!(body["message"].as_str().unwrap().contains("[GET] /missing"));
}

#[tokio::test]
async fn test_middleware_value_prevents_not_found() {
    let mut app = App::new();
    app.use_middleware(from_fn(|_event, _next| Box::pin(async { Ok(Reply::from("caught")) })))
        .unwrap();

    let response = common::get(&app, "/missing").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::text(response).await, "caught");
}

#[tokio::test]
async fn test_global_then_route_middleware_then_handler() {
    let trail = Trail::default();
    let mut app = App::new();
    app.use_middleware(tracing_middleware(&trail, "global")).unwrap();

    let handler_trail = trail.clone();
    app.on(
        Method::GET,
        "/ordered",
        sync_handler(move |_| {
            handler_trail.push("handler");
            Ok("done")
        }),
        RouteOptions::new()
            .middleware(tracing_middleware(&trail, "route"))
            .meta("auth", "none"),
    )
    .unwrap();

    let response = common::get(&app, "/ordered").await;
    assert_eq!(common::text(response).await, "done");
    assert_eq!(trail.steps(), vec!["global:/ordered", "route:/ordered", "handler"]);

    // Route middleware does not run for other routes.
    let response = common::get(&app, "/elsewhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(trail.steps().len(), 4);
}

#[tokio::test]
async fn test_each_middleware_and_handler_run_once() {
    let mw_hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = Arc::new(AtomicUsize::new(0));

    let mut app = App::new();
    for _ in 0..3 {
        let hits = mw_hits.clone();
        app.use_middleware(from_fn(move |event, next| {
            let hits = hits.clone();
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
                next.run(event).await
            })
        }))
        .unwrap();
    }
    let hits = handler_hits.clone();
    app.get(
        "/",
        sync_handler(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .unwrap();

    common::get(&app, "/").await;
    assert_eq!(mw_hits.load(Ordering::SeqCst), 3);
    assert_eq!(handler_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_predicates_skip_middleware() {
    let trail = Trail::default();
    let mut app = App::new();
    app.use_at("/admin/**", tracing_middleware(&trail, "admin")).unwrap();
    app.use_with(
        tracing_middleware(&trail, "post-only"),
        MiddlewareOptions::new().method(Method::POST),
    )
    .unwrap();
    app.use_with(
        tracing_middleware(&trail, "custom"),
        MiddlewareOptions::new().matcher(FnMatcher::new(|event| event.url().query().is_some())),
    )
    .unwrap();
    app.all("/**", sync_handler(|_| Ok("ok"))).unwrap();

    common::get(&app, "/public").await;
    assert!(trail.steps().is_empty());

    common::get(&app, "/admin/users?x=1").await;
    assert_eq!(trail.steps(), vec!["admin:/admin/users", "custom:/admin/users"]);

    app.request(Method::POST, "/public").await;
    assert_eq!(trail.steps().last().unwrap(), "post-only:/public");
}

#[tokio::test]
async fn test_most_specific_route_wins() {
    let mut app = App::new();
    app.all("/users/**", sync_handler(|_| Ok("wildcard"))).unwrap();
    app.get("/users/:id", sync_handler(|_| Ok("param"))).unwrap();
    app.get("/users/me", sync_handler(|_| Ok("static"))).unwrap();

    assert_eq!(common::text(common::get(&app, "/users/me").await).await, "static");
    assert_eq!(common::text(common::get(&app, "/users/7").await).await, "param");
    assert_eq!(common::text(common::get(&app, "/users/7/posts").await).await, "wildcard");
    assert_eq!(common::text(common::get(&app, "/users/").await).await, "wildcard");
}

#[tokio::test]
async fn test_method_specific_beats_any() {
    let mut app = App::new();
    app.on(MethodMatch::Any, "/thing", sync_handler(|_| Ok("any")), RouteOptions::new())
        .unwrap();
    app.post("/thing", sync_handler(|_| Ok("post"))).unwrap();

    let response = app.request(Method::POST, "/thing").await;
    assert_eq!(common::text(response).await, "post");
    let response = app.request(Method::DELETE, "/thing").await;
    assert_eq!(common::text(response).await, "any");
}

#[tokio::test]
async fn test_context_flows_forward() {
    let mut app = App::new();
    app.use_middleware(from_fn(|event, next| {
        Box::pin(async move {
            event.context.set("user", "ada");
            next.run(event).await
        })
    }))
    .unwrap();
    app.get(
        "/me",
        sync_handler(|event| {
            let user = event.context.get("user").cloned().unwrap_or_default();
            let route = event
                .context
                .matched_route
                .as_ref()
                .map(|route| route.pattern().to_string());
            Reply::json(&json!({ "user": user, "route": route }))
        }),
    )
    .unwrap();

    let body = common::json(common::get(&app, "/me").await).await;
    assert_eq!(body, json!({ "user": "ada", "route": "/me" }));
}

#[tokio::test]
async fn test_async_handler_reads_body() {
    let mut app = App::new();
    app.post(
        "/echo",
        handler_fn(|event| {
            Box::pin(async move {
                let text = event.req().text().await?;
                Ok(Reply::from(text.to_uppercase()))
            })
        }),
    )
    .unwrap();

    let request = Request::new(Method::POST, "/echo").unwrap().with_body("shout");
    let response = app.fetch(request).await;
    assert_eq!(common::text(response).await, "SHOUT");
}

#[tokio::test]
async fn test_on_request_hook_runs_first_and_can_fail() {
    let config = AppConfig::builder()
        .on_request(|event| {
            Box::pin(async move {
                if event.pathname() == "/blocked" {
                    return Err(Error::http(HttpError::from_status(403, None)));
                }
                event.context.set("seen", true);
                Ok(())
            })
        })
        .build();

    let mut app = App::with_config(config);
    app.all(
        "/**",
        sync_handler(|event| Ok(if event.context.get("seen").is_some() { "seen" } else { "unseen" })),
    )
    .unwrap();

    assert_eq!(common::text(common::get(&app, "/open").await).await, "seen");
    assert_eq!(common::get(&app, "/blocked").await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unparsable_input_is_bad_request() {
    let app = App::new();
    let response = app.request(Method::GET, "not a url").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
