//! Mounting sub-apps and fetch targets under a base path.

use axum::http::{Method, StatusCode};
use switchyard::handler::{from_fn, sync_handler};
use switchyard::utils::with_base;
use switchyard::{App, Error, MountTarget, Request, Response};

mod common;

use common::Trail;

fn recording(trail: &Trail, name: &'static str) -> impl switchyard::handler::Middleware {
    let trail = trail.clone();
    from_fn(move |event, next| {
        let trail = trail.clone();
        Box::pin(async move {
            trail.push(format!("{name} before {}", event.pathname()));
            let outcome = next.run(event).await;
            trail.push(format!("{name} after {}", event.pathname()));
            outcome
        })
    })
}

#[tokio::test]
async fn test_mounted_route_is_reachable() {
    let mut sub = App::new();
    sub.get("/ping", sync_handler(|_| Ok("pong"))).unwrap();

    let mut app = App::new();
    app.mount("/api", sub).unwrap();

    let response = common::get(&app, "/api/ping").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::text(response).await, "pong");

    assert_eq!(common::get(&app, "/ping").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sub_middleware_sees_relative_path() {
    let trail = Trail::default();

    let mut sub = App::new();
    sub.use_middleware(recording(&trail, "inner")).unwrap();
    let seen = trail.clone();
    sub.get(
        "/ping",
        sync_handler(move |event| {
            seen.push(format!("handler {}", event.pathname()));
            Ok("pong")
        }),
    )
    .unwrap();

    let mut app = App::new();
    app.use_middleware(recording(&trail, "outer")).unwrap();
    app.mount("/api", sub).unwrap();

    let response = common::get(&app, "/api/ping").await;
    assert_eq!(common::text(response).await, "pong");
    assert_eq!(
        trail.steps(),
        vec![
            "outer before /api/ping",
            "inner before /ping",
            "handler /api/ping",
            "inner after /ping",
            "outer after /api/ping",
        ]
    );
}

#[tokio::test]
async fn test_sub_middleware_skipped_outside_base() {
    let trail = Trail::default();

    let mut sub = App::new();
    sub.use_middleware(recording(&trail, "inner")).unwrap();
    sub.get("/ping", sync_handler(|_| Ok("pong"))).unwrap();

    let mut app = App::new();
    app.mount("/api", sub).unwrap();
    app.get("/other", sync_handler(|_| Ok("other"))).unwrap();

    assert_eq!(common::text(common::get(&app, "/other").await).await, "other");
    assert!(trail.steps().is_empty());
}

#[tokio::test]
async fn test_fetch_target_receives_rewritten_url() {
    let mut app = App::new();
    app.mount(
        "/proxy",
        MountTarget::fetch(|request: Request| async move {
            let url = request.url();
            let body = format!(
                "{} {}?{}",
                request.method(),
                url.path(),
                url.query().unwrap_or_default()
            );
            Ok::<_, Error>(Response::new(body))
        }),
    )
    .unwrap();

    let response = app.request(Method::PUT, "/proxy/items/3?full=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::text(response).await, "PUT /items/3?full=1");
}

#[tokio::test]
async fn test_with_base_handler() {
    let mut inner = App::new();
    inner
        .get(
            "/users/:id",
            sync_handler(|event| {
                let id = event.param("id").unwrap_or_default();
                Ok(format!("{id} at {}", event.pathname()))
            }),
        )
        .unwrap();

    let mut app = App::new();
    app.all("/v2/**", with_base("/v2", inner)).unwrap();

    let response = common::get(&app, "/v2/users/5").await;
    assert_eq!(common::text(response).await, "5 at /users/5");
}

#[tokio::test]
async fn test_resolve_through_mounts() {
    let mut leaf = App::new();
    leaf.post("/items/:id", sync_handler(|_| Ok("item"))).unwrap();

    let mut app = App::new();
    app.all("/shop/**", with_base("/shop", leaf)).unwrap();

    let resolved = app.resolve(&Method::POST, "/shop/items/12").unwrap();
    assert_eq!(resolved.route, "/shop/items/:id");
    assert_eq!(resolved.params["id"], "12");

    let fallback = app.resolve(&Method::GET, "/shop/items/12").unwrap();
    assert_eq!(fallback.route, "/shop/**");
    assert!(app.resolve(&Method::GET, "/elsewhere").is_none());
}

#[tokio::test]
async fn test_registration_closed_rejects_mounts() {
    let mut app = App::new();
    app.close_registration();

    let result = app.mount("/api", App::new());
    assert!(matches!(result, Err(switchyard::RegistrationError::Closed)));
}

#[tokio::test]
async fn test_failing_fetch_target_is_bad_gateway() {
    let mut app = App::new();
    app.mount(
        "/upstream",
        MountTarget::fetch(|_request: Request| async move {
            Err::<Response, _>(Error::msg("connection refused"))
        }),
    )
    .unwrap();

    let response = common::get(&app, "/upstream/anything").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(common::json(response).await["message"], "Upstream request failed");
}

#[tokio::test]
async fn test_base_without_leading_slash() {
    let trail = Trail::default();

    let mut sub = App::new();
    sub.use_middleware(recording(&trail, "inner")).unwrap();
    sub.get("/ping", sync_handler(|_| Ok("pong"))).unwrap();

    let mut app = App::new();
    app.mount("api/", sub).unwrap();

    let response = common::get(&app, "/api/ping").await;
    assert_eq!(common::text(response).await, "pong");
    assert_eq!(trail.steps(), vec!["inner before /ping", "inner after /ping"]);
}

#[tokio::test]
async fn test_mounted_app_ignores_path_in_host() {
    let mut sub = App::new();
    sub.get("/public", sync_handler(|event| Ok(event.pathname().to_string())))
        .unwrap();
    sub.get("/admin/public", sync_handler(|_| Ok("admin"))).unwrap();

    let mut app = App::new();
    app.mount("/v1", sub).unwrap();

    let mut headers = axum::http::HeaderMap::new();
    headers.insert("host", "example.com/v1/admin".parse().unwrap());
    let request = Request::with_headers(Method::GET, "/v1/public", headers).unwrap();

    let response = app.fetch(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::text(response).await, "/v1/public");
}
