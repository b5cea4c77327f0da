//! # Bazaar API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  .env → ApiConfig::load                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite pool + migrations ──► AppState ◄── DistanceProvider             │
//! │       │                          │          (Google or haversine)       │
//! │       ▼                          ▼                                      │
//! │  maintenance job            axum::serve (HTTP_PORT)                     │
//! │                                  │                                      │
//! │                          Ctrl+C / SIGTERM → graceful shutdown           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use bazaar_api::distance::{DistanceProvider, GoogleMapsClient, HaversineEstimator};
use bazaar_api::{build_router, jobs, ApiConfig, AppState};
use bazaar_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bazaar_api=debug,bazaar_db=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Bazaar API server...");

    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set, using the development secret");
    }

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await?;
    info!("Database ready");

    let distance: Arc<dyn DistanceProvider> = match &config.maps_api_key {
        Some(key) => {
            info!("Using Google Distance Matrix for delivery routes");
            Arc::new(GoogleMapsClient::new(key.clone(), config.maps_base_url.clone())?)
        }
        None => {
            info!(
                speed_kmh = config.average_speed_kmh,
                "MAPS_API_KEY not set, estimating routes by straight-line distance"
            );
            Arc::new(HaversineEstimator::new(config.average_speed_kmh))
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = Arc::new(AppState::new(db.clone(), config, distance));

    let job = jobs::spawn(state.clone());
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    job.abort();
    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
