//! Shared axum server runner used by the ingestion and processing surfaces.

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Configuration for an HTTP server.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Bind `config.host:config.port` (host may be a name such as `localhost`) and serve `router` until the token is
/// cancelled. In-flight requests are allowed to finish.
pub async fn run_http_server(
    config: HttpServerConfig,
    router: Router,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind HTTP server to {}:{}",
                config.host, config.port
            )
        })?;

    serve_listener(listener, router, cancellation_token).await
}

/// Serve on an already bound listener.
pub async fn serve_listener(
    listener: TcpListener,
    router: Router,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(address = %addr, "Starting HTTP server");

    let app = router.layer(TraceLayer::new_for_http());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            debug!(address = %addr, "HTTP server shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    info!(address = %addr, "HTTP server stopped");
    Ok(())
}
