//! HTTP server: the axum runtime adapter.
//!
//! # Responsibilities
//! - Create the axum Router with a single fallback into `App::fetch`
//! - Translate axum requests into [`Request`] (body collected with a limit)
//! - Translate [`Response`] back into an axum response (bytes or stream)
//! - Wire up middleware (tracing, request ID)
//! - Serve on a listener with graceful shutdown

use std::io;
use std::sync::Arc;

use axum::body::Body as AxumBody;
use axum::extract::State;
use axum::http::header::CONTENT_LENGTH;
use axum::Router;
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::config::ServerSettings;
use crate::error::HttpError;
use crate::lifecycle::shutdown::recv_shutdown;
use crate::normalize;

use super::body::Body;
use super::request::Request;
use super::response::Response;

/// State injected into the fallback handler.
#[derive(Clone)]
struct AdapterState {
    app: Arc<App>,
    max_body_bytes: usize,
}

/// HTTP server serving one App.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(app: Arc<App>, settings: &ServerSettings) -> Self {
        let state = AdapterState {
            app,
            max_body_bytes: settings.max_body_bytes,
        };
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AdapterState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router, for embedding or for driving with `tower::ServiceExt`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(recv_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(
    State(state): State<AdapterState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let method = request.method().clone();
    let response = match into_request(request, state.max_body_bytes).await {
        Ok(request) => state.app.fetch(request).await,
        Err(error) => {
            tracing::debug!(status = error.status().as_u16(), error = %error, "Rejected request");
            normalize::strip_null_body(normalize::error_response(&error, state.app.config()), &method)
        }
    };
    into_axum(response)
}

async fn into_request(request: axum::extract::Request, limit: usize) -> Result<Request, HttpError> {
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(HttpError::payload_too_large(limit));
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|error| {
        if is_length_limit(&error) {
            HttpError::payload_too_large(limit)
        } else {
            HttpError::from_status(400, None)
                .with_message("Failed to read request body")
                .with_cause(error)
        }
    })?;

    let input = if parts.uri.scheme().is_some() {
        parts.uri.to_string()
    } else {
        parts
            .uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string())
    };

    let request = Request::with_headers(parts.method, &input, parts.headers).map_err(|error| {
        HttpError::from_status(400, None)
            .with_message(error.to_string())
            .with_cause(error)
    })?;
    Ok(request.with_body(bytes))
}

fn is_length_limit(error: &axum::Error) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Status text has no HTTP/1.1 or HTTP/2 wire representation in hyper and is dropped.
fn into_axum(response: Response) -> axum::response::Response {
    let status = response.status();
    let headers = response.headers().clone();
    let body = match response.into_body() {
        Body::Empty => AxumBody::empty(),
        Body::Bytes(bytes) => AxumBody::from(bytes),
        stream @ Body::Stream(_) => AxumBody::from_stream(stream.into_stream()),
    };

    let mut out = axum::response::Response::new(body);
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_length_limit_is_recognized_by_type() {
        let error = axum::body::to_bytes(AxumBody::from("x".repeat(16)), 4)
            .await
            .unwrap_err();
        assert!(is_length_limit(&error));

        let lookalike = axum::Error::new(io::Error::other("length limit exceeded"));
        assert!(!is_length_limit(&lookalike));
    }
}
