use anyhow::Context;
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classbook::api::middleware::session::{create_session_layer, AppState};
use classbook::config::Config;
use classbook::db;

const MIN_SESSION_SECRET_LEN: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classbook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting classbook admin server...");

    // Load configuration
    let config = Config::from_env()?;
    anyhow::ensure!(
        config.session_secret.expose_secret().len() >= MIN_SESSION_SECRET_LEN,
        "SESSION_SECRET must be at least {} characters",
        MIN_SESSION_SECRET_LEN
    );
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create session layer
    let session_layer = create_session_layer(pool.clone(), config.secure_cookies).await?;
    tracing::info!("Session layer initialized");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config,
    };

    // Build router
    let app = classbook::api::app(state, session_layer);

    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
