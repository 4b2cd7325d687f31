//! Redis-backed store.
//!
//! # Key Patterns
//!
//! - `{prefix_room}{id}` - Room record (JSON string, `SET EX`)
//! - `{prefix_session}{id}` - Session set (HASH of session ID to handle, `EXPIRE`)
//!
//! Expiry is left to Redis. The session hash gets the room's TTL whenever a
//! session is added or the room is extended.
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently, so every call clones it instead of locking.

use super::{RoomRecord, SessionRecord, Store, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Redis [`Store`] implementation.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    prefix_room: String,
    prefix_session: String,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the URL is invalid or the connection fails.
    pub async fn connect(
        redis_url: &str,
        prefix_room: impl Into<String>,
        prefix_session: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::open(redis_url).map_err(|e| {
            // The URL may carry credentials; never log it.
            error!(target: "room.store.redis", error = %e, "Failed to open Redis client");
            StoreError::Backend(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "room.store.redis", error = %e, "Failed to connect to Redis");
                StoreError::Backend(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            prefix_room: prefix_room.into(),
            prefix_session: prefix_session.into(),
        })
    }

    fn room_key(&self, id: &str) -> String {
        room_key(&self.prefix_room, id)
    }

    fn session_key(&self, room_id: &str) -> String {
        session_key(&self.prefix_session, room_id)
    }
}

fn room_key(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
}

fn session_key(prefix: &str, room_id: &str) -> String {
    format!("{prefix}{room_id}")
}

/// Redis wants whole seconds; never round a live TTL down to zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn backend(op: &'static str) -> impl Fn(redis::RedisError) -> StoreError {
    move |e| {
        warn!(target: "room.store.redis", error = %e, operation = op, "Redis command failed");
        StoreError::Backend(format!("{op} failed: {e}"))
    }
}

fn encode_room(room: &RoomRecord) -> Result<String, StoreError> {
    serde_json::to_string(room).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_room(raw: &str) -> Result<RoomRecord, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl Store for RedisStore {
    #[instrument(skip_all, fields(room_id = %room.id))]
    async fn add_room(&self, room: RoomRecord, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let payload = encode_room(&room)?;
        let _: () = conn
            .set_ex(self.room_key(&room.id), payload, ttl_seconds(ttl))
            .await
            .map_err(backend("set_ex"))?;
        Ok(())
    }

    #[instrument(skip_all, fields(room_id = %id))]
    async fn get_room(&self, id: &str) -> Result<Option<RoomRecord>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(self.room_key(id)).await.map_err(backend("get"))?;
        raw.as_deref().map(decode_room).transpose()
    }

    async fn room_exists(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        conn.exists(self.room_key(id))
            .await
            .map_err(backend("exists"))
    }

    #[instrument(skip_all, fields(room_id = %id))]
    async fn extend_room_ttl(&self, id: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let secs = i64::try_from(ttl_seconds(ttl)).unwrap_or(i64::MAX);

        let (room_extended, _sessions_extended): (bool, bool) = redis::pipe()
            .atomic()
            .expire(self.room_key(id), secs)
            .expire(self.session_key(id), secs)
            .query_async(&mut conn)
            .await
            .map_err(backend("expire"))?;

        if room_extended {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    #[instrument(skip_all, fields(room_id = %id))]
    async fn remove_room(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(&[self.room_key(id), self.session_key(id)])
            .await
            .map_err(backend("del"))?;
        Ok(())
    }

    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn add_session(
        &self,
        session_id: &str,
        handle: &str,
        room_id: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let key = self.session_key(room_id);
        let secs = i64::try_from(ttl_seconds(ttl)).unwrap_or(i64::MAX);

        let _: () = redis::pipe()
            .atomic()
            .hset(&key, session_id, handle)
            .ignore()
            .expire(&key, secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend("hset"))?;
        Ok(())
    }

    async fn get_session(
        &self,
        session_id: &str,
        room_id: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.connection.clone();
        let handle: Option<String> = conn
            .hget(self.session_key(room_id), session_id)
            .await
            .map_err(backend("hget"))?;

        Ok(handle.map(|handle| SessionRecord {
            id: session_id.to_string(),
            handle,
        }))
    }

    async fn remove_session(&self, session_id: &str, room_id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .hdel(self.session_key(room_id), session_id)
            .await
            .map_err(backend("hdel"))?;
        Ok(())
    }

    async fn clear_sessions(&self, room_id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(self.session_key(room_id))
            .await
            .map_err(backend("del"))?;
        Ok(())
    }
}
