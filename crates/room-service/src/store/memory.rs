//! Process-local store.
//!
//! Rooms and their sessions live in a single map guarded by a
//! `tokio::sync::Mutex`. Each room carries an expiry instant; reads treat an
//! expired room as absent and [`MemoryStore::spawn_sweeper`] reclaims the
//! memory periodically.

use super::{RoomRecord, SessionRecord, Store, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct StoredRoom {
    record: RoomRecord,
    /// Session ID to handle.
    sessions: HashMap<String, String>,
    expires_at: Instant,
}

impl StoredRoom {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<String, StoredRoom>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the background task that drops expired rooms every `interval`.
    ///
    /// The task exits when `cancel_token` is cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        info!(target: "room.store.memory", "Expiry sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = store.sweep_expired().await;
                        if removed > 0 {
                            debug!(
                                target: "room.store.memory",
                                removed,
                                "Swept expired rooms"
                            );
                        }
                    }
                }
            }
        })
    }

    /// Remove expired rooms now. Returns how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut rooms = self.rooms.lock().await;
        let before = rooms.len();
        rooms.retain(|_, room| !room.is_expired(now));
        before - rooms.len()
    }

    /// Number of stored rooms, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add_room(&self, room: RoomRecord, ttl: Duration) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        rooms.insert(
            room.id.clone(),
            StoredRoom {
                record: room,
                sessions: HashMap::new(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get_room(&self, id: &str) -> Result<Option<RoomRecord>, StoreError> {
        let now = Instant::now();
        let rooms = self.rooms.lock().await;
        Ok(rooms
            .get(id)
            .filter(|room| !room.is_expired(now))
            .map(|room| room.record.clone()))
    }

    async fn room_exists(&self, id: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(id).is_some_and(|room| !room.is_expired(now)))
    }

    async fn extend_room_ttl(&self, id: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(id) {
            Some(room) if !room.is_expired(now) => {
                room.expires_at = now + ttl;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn remove_room(&self, id: &str) -> Result<(), StoreError> {
        self.rooms.lock().await.remove(id);
        Ok(())
    }

    async fn add_session(
        &self,
        session_id: &str,
        handle: &str,
        room_id: &str,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        // Sessions share the room's expiry.
        let now = Instant::now();
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(room_id) {
            Some(room) if !room.is_expired(now) => {
                room.sessions
                    .insert(session_id.to_string(), handle.to_string());
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn get_session(
        &self,
        session_id: &str,
        room_id: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let now = Instant::now();
        let rooms = self.rooms.lock().await;
        Ok(rooms
            .get(room_id)
            .filter(|room| !room.is_expired(now))
            .and_then(|room| room.sessions.get(session_id))
            .map(|handle| SessionRecord {
                id: session_id.to_string(),
                handle: handle.clone(),
            }))
    }

    async fn remove_session(&self, session_id: &str, room_id: &str) -> Result<(), StoreError> {
        if let Some(room) = self.rooms.lock().await.get_mut(room_id) {
            room.sessions.remove(session_id);
        }
        Ok(())
    }

    async fn clear_sessions(&self, room_id: &str) -> Result<(), StoreError> {
        if let Some(room) = self.rooms.lock().await.get_mut(room_id) {
            room.sessions.clear();
        }
        Ok(())
    }
}
