//! model-endpoint HTTP server binary.
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`: token signing secret (required)
//! - `BIND_ADDR` / `PORT`: listen address (default: 0.0.0.0:8080)
//! - `AUTH_BACKEND_URL`: identity provider for delegated logins (optional)
//! - `AUTH_DEV_EMAIL` / `AUTH_DEV_PASSWORD`: local development login (optional)
//! - `RUST_LOG`: Tracing filter (default: "info,model_endpoint=debug")
//!
//! # Usage
//!
//! ```bash
//! JWT_SECRET=change-me cargo run --bin server
//! ```

use anyhow::Context;
use model_endpoint::config::AppConfig;
use model_endpoint::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,model_endpoint=debug".into()),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let state = AppState::from_config(&config).context("failed to set up authentication")?;
    let kinds = state.registry.implemented_kinds();
    let token_route = state.token_route.clone();
    let app = app_router(state);

    tracing::info!(
        "{} {} starting on {}",
        model_endpoint::SERVICE_NAME,
        model_endpoint::VERSION,
        config.bind_addr
    );
    tracing::info!(kinds = ?kinds, "Model kinds available");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  {}/status/ liveness probe", model_endpoint::api_prefix());
    tracing::info!("  POST {} token issuance", token_route);
    tracing::info!("  *    {}/models/ model registry", model_endpoint::api_prefix());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
