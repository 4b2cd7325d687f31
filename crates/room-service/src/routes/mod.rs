//! HTTP routes for the room service.
//!
//! Defines the Axum router and application state.

use crate::actors::Hub;
use crate::config::Config;
use crate::handlers;
use crate::observability::{health_router, HealthState};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Room registry.
    pub hub: Arc<Hub>,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `POST /api/rooms` - Create a room
/// - `POST /api/rooms/:id/login` - Log into a room (sets the session cookie)
/// - `DELETE /api/rooms/:id/login` - Log out
/// - `GET /ws/:id` - WebSocket upgrade for a logged-in peer
/// - `/health`, `/ready` - Probes
/// - `/metrics` - Prometheus scrape endpoint, when a recorder is installed
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(
    state: Arc<AppState>,
    health: Arc<HealthState>,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let api_routes = Router::new()
        .route("/api/rooms", post(handlers::create_room))
        .route(
            "/api/rooms/:id/login",
            post(handlers::login).delete(handlers::logout),
        )
        .route("/ws/:id", get(handlers::connect))
        .with_state(state);

    let mut router = api_routes.merge(health_router(health));

    if let Some(handle) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(handlers::metrics_handler))
                .with_state(handle),
        );
    }

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
