//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::Method;
use serde_json::Value;
use switchyard::config::ServerSettings;
use switchyard::lifecycle::Shutdown;
use switchyard::{App, HttpServer, Response};
use tokio::net::TcpListener;

/// Ordered record of chain steps, shared between middleware closures.
#[derive(Clone, Default)]
pub struct Trail(Arc<Mutex<Vec<String>>>);

impl Trail {
    pub fn push(&self, step: impl Into<String>) {
        self.0.lock().unwrap().push(step.into());
    }

    pub fn steps(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub async fn get(app: &App, path: &str) -> Response {
    app.request(Method::GET, path).await
}

pub async fn text(response: Response) -> String {
    response.text().await.unwrap()
}

pub async fn json(response: Response) -> Value {
    response.json().await.unwrap()
}

/// Serve `app` on an ephemeral local port until the returned handle is triggered.
pub async fn start_server(mut app: App) -> (SocketAddr, Shutdown) {
    app.close_registration();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(Arc::new(app), &ServerSettings::default());
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (addr, shutdown)
}
