//! Observability for the room service.
//!
//! # Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `hush_rooms_active` | gauge | - |
//! | `hush_peers_connected` | gauge | - |
//! | `hush_rooms_created_total` | counter | - |
//! | `hush_rooms_disposed_total` | counter | `reason` |
//! | `hush_joins_rejected_total` | counter | - |
//! | `hush_peers_rate_limited_total` | counter | - |
//! | `hush_messages_broadcast_total` | counter | `message_type` |
//!
//! # Log targets
//!
//! `room.hub`, `room.actor.room`, `room.actor.peer`, `room.store.memory`,
//! `room.store.redis`, `room.transport`, `room.http`.

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
