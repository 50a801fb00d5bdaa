//! Forwarding requests to an upstream server and to another App.

use std::sync::Arc;

use axum::http::header::{HeaderValue, CONTENT_LENGTH, HOST, SET_COOKIE};
use axum::http::{HeaderName, Method, StatusCode};
use switchyard::handler::{handler_fn, sync_handler};
use switchyard::utils::{
    fetch_with_event, get_request_host, proxy_request, set_cookie, CookieOptions, CookieRewrite,
    ProxyOptions,
};
use switchyard::{App, Reply, Request};

mod common;

fn upstream() -> App {
    let mut app = App::new();
    app.post(
        "/echo",
        handler_fn(|event| {
            Box::pin(async move {
                let token = event
                    .headers()
                    .get("x-token")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string();
                let body = event.req().text().await?;
                let query = event.url().query().unwrap_or_default().to_string();
                set_cookie(event, "sid", "1", &CookieOptions::default().domain("upstream.test"));
                Ok(Reply::from(format!("{} {} {query} {token} {body}", event.method(), event.pathname())))
            })
        }),
    )
    .unwrap();
    app
}

fn front(target: String, options: ProxyOptions) -> App {
    let target = Arc::new(target);
    let options = Arc::new(options);
    let mut app = App::new();
    app.all(
        "/api/**",
        handler_fn(move |event| {
            let target = target.clone();
            let options = options.clone();
            Box::pin(async move { proxy_request(event, &target, &options).await })
        }),
    )
    .unwrap();
    app
}

#[tokio::test]
async fn test_proxy_forwards_method_headers_and_body() {
    let (addr, shutdown) = common::start_server(upstream()).await;
    let options = ProxyOptions {
        cookie_domain_rewrite: Some(CookieRewrite::All("front.test".to_string())),
        ..ProxyOptions::default()
    };
    let app = front(format!("http://{addr}/echo?via=proxy"), options);

    let request = Request::new(Method::POST, "/api/anything")
        .unwrap()
        .with_header(HeaderName::from_static("x-token"), HeaderValue::from_static("secret"))
        .with_body("payload");
    let response = app.fetch(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(CONTENT_LENGTH).is_none());
    assert_eq!(
        response.headers()[SET_COOKIE],
        "sid=1; Path=/; Domain=front.test"
    );
    assert_eq!(common::text(response).await, "POST /echo via=proxy secret payload");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let app = front("http://127.0.0.1:1/".to_string(), ProxyOptions::default());

    let response = common::get(&app, "/api/down").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(common::json(response).await["message"], "Upstream request failed");
}

#[tokio::test]
async fn test_fetch_with_event_keeps_request_headers() {
    let mut backend = App::new();
    backend
        .get("/whoami", sync_handler(|event| Ok(get_request_host(event, false))))
        .unwrap();
    let backend = Arc::new(backend);

    let mut app = App::new();
    app.get(
        "/me",
        handler_fn(move |event| {
            let backend = backend.clone();
            Box::pin(async move {
                let response = fetch_with_event(&backend, event, Method::GET, "/whoami").await?;
                Ok(Reply::Response(response))
            })
        }),
    )
    .unwrap();

    let request = Request::new(Method::GET, "/me")
        .unwrap()
        .with_header(HOST, HeaderValue::from_static("front.test"));
    let response = app.fetch(request).await;
    assert_eq!(common::text(response).await, "front.test");
}
