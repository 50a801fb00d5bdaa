//! switchyard server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ axum adapter (request id, trace, body limit)
//!                          │
//!                          ▼
//!                     App::fetch ── on_request
//!                          │
//!                          ▼
//!        global middleware ▶ route middleware ▶ handler | NotFound
//!                          │
//!                          ▼
//!                     normalize ── on_error (once)
//!                          │
//!     Client Response      ▼
//!     ◀─────────────── on_response ── metrics
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use switchyard::config::{load_settings, AppConfig, Settings};
use switchyard::handler::{from_fn, sync_handler};
use switchyard::lifecycle::{signals, Shutdown};
use switchyard::observability::{logging, metrics};
use switchyard::{App, HttpServer, Reply};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "HTTP request-dispatch server", long_about = None)]
struct Cli {
    /// Path to a TOML settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    if let Some(bind) = cli.bind {
        settings.server.bind_address = bind;
    }

    logging::init_logging(&settings.logging)?;
    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %settings.server.bind_address,
        max_body_bytes = settings.server.max_body_bytes,
        debug = settings.app.debug,
        "Configuration loaded"
    );

    if settings.metrics.enabled {
        match settings.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %settings.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut app = build_app(AppConfig::from_settings(&settings.app))?;
    app.close_registration();
    let app = Arc::new(app);

    let listener = TcpListener::bind(&settings.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(app, &settings.server);
    let serving = server.run(listener, shutdown.subscribe());
    signals::spawn_signal_handler(shutdown);
    serving.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_app(config: AppConfig) -> Result<App, switchyard::RegistrationError> {
    let mut app = App::with_config(config);

    app.use_middleware(from_fn(|event, next| {
        Box::pin(async move {
            tracing::debug!(method = %event.method(), path = %event.path(), "Dispatching");
            next.run(event).await
        })
    }))?;

    app.get("/", sync_handler(|_| Ok("switchyard")))?
        .get("/health", sync_handler(|_| Reply::json(&json!({ "status": "ok" }))))?
        .get(
            "/id/:id",
            sync_handler(|event| Ok(event.param("id").unwrap_or_default().to_string())),
        )?;

    Ok(app)
}
