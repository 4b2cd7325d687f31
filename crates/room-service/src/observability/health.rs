//! Liveness and readiness probes.
//!
//! The service moves through three phases: `starting` until the store is
//! connected and the listener is bound, `serving` while it accepts rooms and
//! peers, and `draining` once a shutdown signal arrived. Rooms keep running
//! while draining; only new traffic should go elsewhere.
//!
//! - `GET /health` - 200 whenever the process answers
//! - `GET /ready` - 200 while serving, 503 otherwise
//!
//! Both return `{"status": "<phase>"}`. `/metrics` is routed separately; see
//! [`crate::routes::build_routes`].

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle phase reported by the probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ServicePhase {
    Starting = 0,
    Serving = 1,
    Draining = 2,
}

impl ServicePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServicePhase::Serving,
            2 => ServicePhase::Draining,
            _ => ServicePhase::Starting,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProbeBody {
    status: ServicePhase,
}

/// Probe state shared between `main` and the health router.
#[derive(Debug, Default)]
pub struct HealthState {
    phase: AtomicU8,
}

impl HealthState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener is bound and the hub accepts rooms.
    ///
    /// Ignored once draining; a shutting-down service never becomes ready again.
    pub fn mark_serving(&self) {
        let _ = self.phase.compare_exchange(
            ServicePhase::Starting as u8,
            ServicePhase::Serving as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Shutdown signal received.
    pub fn mark_draining(&self) {
        self.phase
            .store(ServicePhase::Draining as u8, Ordering::SeqCst);
    }

    #[must_use]
    pub fn phase(&self) -> ServicePhase {
        ServicePhase::from_u8(self.phase.load(Ordering::SeqCst))
    }
}

/// Router serving `/health` and `/ready`.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(health_state)
}

async fn health(State(state): State<Arc<HealthState>>) -> Json<ProbeBody> {
    Json(ProbeBody {
        status: state.phase(),
    })
}

async fn ready(State(state): State<Arc<HealthState>>) -> (StatusCode, Json<ProbeBody>) {
    let phase = state.phase();
    let code = if phase == ServicePhase::Serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(ProbeBody { status: phase }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    async fn probe(state: &Arc<HealthState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = health_router(Arc::clone(state))
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_phase_transitions() {
        let state = HealthState::new();
        assert_eq!(state.phase(), ServicePhase::Starting);

        state.mark_serving();
        assert_eq!(state.phase(), ServicePhase::Serving);

        state.mark_draining();
        assert_eq!(state.phase(), ServicePhase::Draining);

        state.mark_serving();
        assert_eq!(state.phase(), ServicePhase::Draining, "draining is final");
    }

    #[tokio::test]
    async fn test_health_answers_in_every_phase() {
        let state = Arc::new(HealthState::new());
        for expected in ["starting", "serving", "draining"] {
            let (status, body) = probe(&state, "/health").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], expected);

            if expected == "starting" {
                state.mark_serving();
            } else {
                state.mark_draining();
            }
        }
    }

    #[tokio::test]
    async fn test_ready_only_while_serving() {
        let state = Arc::new(HealthState::new());
        let (status, body) = probe(&state, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "starting");

        state.mark_serving();
        assert_eq!(probe(&state, "/ready").await.0, StatusCode::OK);

        state.mark_draining();
        let (status, body) = probe(&state, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "draining");
    }
}
