use anyhow::Context;
use tracing::info;

use gatekeeper_api::{app, config::AppConfig};
use gatekeeper_infra::JanitorRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatekeeper_observability::init();

    let config = AppConfig::from_env();
    let auth = app::services::build_auth_service(&config).await?;

    let janitor = JanitorRunner::with_interval(config.janitor_interval).spawn("refresh-token-janitor", auth.janitor());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app::router(auth))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    janitor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
