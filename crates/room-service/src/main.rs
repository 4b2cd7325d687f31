//! Hushroom Room Service
//!
//! Serves the room HTTP API, the peer WebSocket endpoint, health probes and
//! Prometheus metrics from a single listener.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Build the store (memory with expiry sweeper, or Redis)
//! 4. Build the hub
//! 5. Bind the listener and serve until ctrl-c / SIGTERM

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;

use common::secret::ExposeSecret;
use room_service::actors::Hub;
use room_service::config::{Config, StoreBackend};
use room_service::observability::{metrics, HealthState};
use room_service::routes::{build_routes, AppState};
use room_service::store::memory::DEFAULT_SWEEP_INTERVAL;
use room_service::store::{MemoryStore, RedisStore, Store};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Room Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        store_backend = ?config.store_backend,
        max_rooms = config.max_rooms,
        max_peers_per_room = config.max_peers_per_room,
        room_timeout_secs = config.room_timeout.as_secs(),
        room_age_secs = config.room_age.as_secs(),
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let prometheus_handle = metrics::init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let health_state = Arc::new(HealthState::new());
    let shutdown_token = CancellationToken::new();

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            let _sweeper =
                store.spawn_sweeper(DEFAULT_SWEEP_INTERVAL, shutdown_token.child_token());
            info!("Using in-memory store");
            store
        }
        StoreBackend::Redis => {
            let url = config
                .redis_url
                .as_ref()
                .ok_or("REDIS_URL is required for the redis store")?;
            info!("Connecting to Redis...");
            let store = RedisStore::connect(
                url.expose_secret(),
                config.redis_prefix_room.clone(),
                config.redis_prefix_session.clone(),
            )
            .await?;
            info!("Redis connection established");
            Arc::new(store)
        }
    };

    let hub = Hub::new(store, config.room_settings());

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        format!("Invalid bind address: {e}")
    })?;

    let state = Arc::new(AppState {
        hub,
        config: config.clone(),
    });
    let app = build_routes(state, Arc::clone(&health_state), Some(prometheus_handle));

    // Bind before marking ready to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind listener");
        format!("Failed to bind to {addr}: {e}")
    })?;

    health_state.mark_serving();
    info!(addr = %addr, "Room Service listening");

    let server_health = Arc::clone(&health_state);
    let server_token = shutdown_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, initiating graceful shutdown...");
            server_health.mark_draining();
            server_token.cancel();
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Server failed");
            e
        })?;

    info!("Room Service shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
