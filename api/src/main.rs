use std::net::SocketAddr;

use api::{
    app::{allowed_origins, build_router},
    bootstrap::build_state,
    config::AppConfig,
    telemetry,
};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing(telemetry::SERVER_FILTER)?;

    let config = AppConfig::from_env()?;
    let origins = allowed_origins(&config.frontend_origins)?;
    tracing::info!(
        plaid_env = ?config.plaid.environment,
        default_window_days = config.default_window_days,
        max_window_days = config.max_window_days,
        balance_refresher = config.enable_balance_refresher,
        "starting balance dashboard"
    );
    let state = build_state(&config).await?;
    let app = build_router(state, origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "listening on address");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
