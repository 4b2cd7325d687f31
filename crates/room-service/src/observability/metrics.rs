//! Metrics definitions for the room service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `hush_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `reason`: dispose reasons (explicit, peer, idle)
//! - `message_type`: outbound wire tags (~10 values)
//!
//! Room IDs and peer IDs are never used as labels.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Room & Peer Gauges
// ============================================================================

/// Set the number of active rooms.
///
/// Metric: `hush_rooms_active`
/// Labels: none
///
/// Updated by the hub whenever a room is registered or deregistered.
pub fn set_rooms_active(count: usize) {
    // usize to f64 conversion is safe for realistic room counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("hush_rooms_active").set(count as f64);
}

/// A peer was admitted to a room.
///
/// Metric: `hush_peers_connected`
pub fn peer_connected() {
    gauge!("hush_peers_connected").increment(1.0);
}

/// A peer left a room or was dropped on disposal.
///
/// Metric: `hush_peers_connected`
pub fn peer_disconnected(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("hush_peers_connected").decrement(count as f64);
}

// ============================================================================
// Lifecycle Counters
// ============================================================================

/// Record a room creation.
///
/// Metric: `hush_rooms_created_total`
pub fn record_room_created() {
    counter!("hush_rooms_created_total").increment(1);
}

/// Record a room disposal.
///
/// Metric: `hush_rooms_disposed_total`
/// Labels: `reason`
pub fn record_room_disposed(reason: &str) {
    counter!("hush_rooms_disposed_total", "reason" => reason.to_string()).increment(1);
}

/// Record a join rejected because the room was full.
///
/// Metric: `hush_joins_rejected_total`
pub fn record_join_rejected() {
    counter!("hush_joins_rejected_total").increment(1);
}

/// Record a peer evicted by the rate limiter.
///
/// Metric: `hush_peers_rate_limited_total`
pub fn record_peer_rate_limited() {
    counter!("hush_peers_rate_limited_total").increment(1);
}

/// Record a broadcast fanned out by a room.
///
/// Metric: `hush_messages_broadcast_total`
/// Labels: `message_type`
pub fn record_broadcast(message_type: &str) {
    counter!("hush_messages_broadcast_total", "message_type" => message_type.to_string())
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These execute against the global no-op recorder; values are not asserted.

    #[test]
    fn test_set_rooms_active() {
        set_rooms_active(0);
        set_rooms_active(1);
        set_rooms_active(1000);
    }

    #[test]
    fn test_peer_gauge() {
        peer_connected();
        peer_connected();
        peer_disconnected(2);
        peer_disconnected(0);
    }

    #[test]
    fn test_lifecycle_counters() {
        record_room_created();
        record_room_disposed("idle");
        record_room_disposed("explicit");
        record_join_rejected();
        record_peer_rate_limited();
    }

    #[test]
    fn test_record_broadcast() {
        record_broadcast("message");
        record_broadcast("peer.join");
        record_broadcast("typing");
    }
}
