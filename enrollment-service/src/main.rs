use anyhow::Context;
use enrollment_service::{
    build_router, config::AppConfig, gateway::PhonePeGateway, repo::PgStore, AppState,
    SERVICE_NAME,
};
use common_observability::ServiceMetrics;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read .env before the subscriber so RUST_LOG set there takes effect.
    let dotenv_result = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    if let Err(err) = dotenv_result {
        // A missing .env is normal outside local development.
        if !err.not_found() {
            warn!(error = %err, "Failed to load .env");
        }
    }

    let config = Arc::new(AppConfig::from_env()?);
    info!(
        merchant_id = %config.gateway.merchant_id,
        gateway = %config.gateway.base_url,
        salt_index = config.gateway.signer.salt_index(),
        "Configuration loaded"
    );

    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("failed to apply migrations")?;
    info!("Database ready");

    let metrics = ServiceMetrics::new().context("failed to register metrics")?;
    let gateway = PhonePeGateway::new(&config.gateway, metrics.clone())?;

    let state = AppState {
        config: config.clone(),
        store: Arc::new(PgStore::new(db)),
        gateway: Arc::new(gateway),
        metrics,
    };
    let app = build_router(state);

    let addr = SocketAddr::new(config.host.parse()?, config.port);
    info!(%addr, "starting {SERVICE_NAME}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
