//! Persistence for room and session records.
//!
//! Everything the service needs to survive a room actor restart lives behind
//! the [`Store`] trait: the room record (name and password hash) and the set
//! of sessions issued for it. Both expire after a TTL; an active room keeps
//! extending its TTL while broadcasts flow.
//!
//! Backends:
//! - [`MemoryStore`]: process-local, with a background expiry sweeper.
//! - [`RedisStore`]: shared across instances, expiry handled by Redis.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Persisted room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    /// bcrypt hash of the room password. Opaque to the room actor.
    pub password_hash: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Persisted session: a logged-in peer's token and chosen handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub handle: String,
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Room and session persistence.
///
/// Every call is self-contained; implementations must not hold locks across
/// calls.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Persist a new room record that expires after `ttl`.
    async fn add_room(&self, room: RoomRecord, ttl: Duration) -> Result<(), StoreError>;

    /// Load a room record. `Ok(None)` if absent or expired.
    async fn get_room(&self, id: &str) -> Result<Option<RoomRecord>, StoreError>;

    /// Whether a live room record exists under `id`.
    async fn room_exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Push the expiry of the room record and its session set to now + `ttl`.
    async fn extend_room_ttl(&self, id: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete a room record and its sessions. Deleting a missing room is not an error.
    async fn remove_room(&self, id: &str) -> Result<(), StoreError>;

    /// Register a session for `room_id`.
    async fn add_session(
        &self,
        session_id: &str,
        handle: &str,
        room_id: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Look up a session. `Ok(None)` if unknown for this room.
    async fn get_session(
        &self,
        session_id: &str,
        room_id: &str,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove one session.
    async fn remove_session(&self, session_id: &str, room_id: &str) -> Result<(), StoreError>;

    /// Remove every session of a room.
    async fn clear_sessions(&self, room_id: &str) -> Result<(), StoreError>;
}
