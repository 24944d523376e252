use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

const HEALTHY: &str = "I am healthy";

pub fn router() -> Router {
    Router::new().route("/healthcheck", get(healthcheck))
}

async fn healthcheck() -> &'static str {
    HEALTHY
}

/// Serve the health endpoint until `ctx` is cancelled
pub async fn serve(addr: String, ctx: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind health endpoint on {addr}"))?;
    info!(addr = %addr, "health endpoint listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { ctx.cancelled().await })
        .await
        .context("health endpoint failed")
}
