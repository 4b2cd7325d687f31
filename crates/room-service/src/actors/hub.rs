//! `Hub` - registry of active room actors.
//!
//! The hub maps room IDs to running [`RoomHandle`]s. It creates rooms
//! (persist, then start the actor), activates stored rooms on demand, and
//! drops rooms again when their actor disposes.
//!
//! The registry lock is never held across a store call or a channel send.

use super::room::{RoomActor, RoomHandle};
use super::RoomSettings;
use crate::errors::RoomError;
use crate::observability::metrics;
use crate::store::{RoomRecord, Store};
use chrono::Utc;
use common::ids::generate_id;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// How many random IDs `add_room` tries before giving up.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Registry and factory for room actors.
pub struct Hub {
    rooms: RwLock<HashMap<String, RoomHandle>>,
    store: Arc<dyn Store>,
    settings: RoomSettings,
}

impl Hub {
    /// Create an empty hub.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, settings: RoomSettings) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            settings,
        })
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    /// Number of registered rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Registry lookup only; never touches the store.
    pub async fn get_room(&self, id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(id).cloned()
    }

    /// Create, persist and start a new room.
    ///
    /// # Errors
    ///
    /// - `RoomLimitReached` if `max_rooms` rooms are already active
    /// - `IdGenerationFailed` if no unused ID was found in `MAX_ID_ATTEMPTS` tries
    /// - `StoreReadFailed` / `StoreWriteFailed` on backend errors
    #[instrument(skip_all)]
    pub async fn add_room(
        self: &Arc<Self>,
        name: String,
        password_hash: Vec<u8>,
    ) -> Result<RoomHandle, RoomError> {
        if self.room_count().await >= self.settings.max_rooms {
            warn!(
                target: "room.hub",
                max_rooms = self.settings.max_rooms,
                "Room limit reached"
            );
            return Err(RoomError::RoomLimitReached);
        }

        let id = self.generate_room_id().await?;
        let record = RoomRecord {
            id: id.clone(),
            name,
            password_hash,
            created_at: Utc::now(),
        };

        self.store
            .add_room(record.clone(), self.settings.room_age)
            .await
            .map_err(|e| RoomError::StoreWriteFailed(e.to_string()))?;

        // Other creations may have filled the hub while this one persisted.
        let handle = {
            let mut rooms = self.rooms.write().await;
            if rooms.len() >= self.settings.max_rooms {
                None
            } else {
                let handle = self.start_room(record);
                rooms.insert(id.clone(), handle.clone());
                metrics::set_rooms_active(rooms.len());
                Some(handle)
            }
        };

        let Some(handle) = handle else {
            warn!(
                target: "room.hub",
                room_id = %id,
                max_rooms = self.settings.max_rooms,
                "Room limit reached, discarding persisted room"
            );
            if let Err(e) = self.store.remove_room(&id).await {
                warn!(target: "room.hub", room_id = %id, error = %e, "Failed to remove room");
            }
            return Err(RoomError::RoomLimitReached);
        };

        metrics::record_room_created();
        info!(target: "room.hub", room_id = %id, "Room created");

        Ok(handle)
    }

    /// Return the running actor for `id`, starting one from the store if needed.
    ///
    /// Concurrent activations of one ID start a single actor.
    ///
    /// # Errors
    ///
    /// - `RoomNotFound` if the store has no such room, or the room is disposing
    /// - `StoreReadFailed` on backend errors
    #[instrument(skip_all, fields(room_id = %id))]
    pub async fn activate_room(self: &Arc<Self>, id: &str) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.get_room(id).await {
            return live(handle);
        }

        let record = self
            .store
            .get_room(id)
            .await
            .map_err(|e| RoomError::StoreReadFailed(e.to_string()))?
            .ok_or(RoomError::RoomNotFound)?;

        let mut rooms = self.rooms.write().await;
        // Another task may have activated it while we were loading.
        if let Some(handle) = rooms.get(id) {
            return live(handle.clone());
        }

        let handle = self.start_room(record);
        rooms.insert(id.to_string(), handle.clone());
        metrics::set_rooms_active(rooms.len());

        debug!(target: "room.hub", room_id = %id, "Room activated from store");
        Ok(handle)
    }

    /// Deregister a room and delete its stored record. Idempotent.
    pub(crate) async fn remove_room(&self, id: &str) {
        // Record first: while the closed handle is still registered,
        // activation reports RoomNotFound instead of reloading the record.
        if let Err(e) = self.store.remove_room(id).await {
            warn!(target: "room.hub", room_id = %id, error = %e, "Failed to delete room record");
        }

        {
            let mut rooms = self.rooms.write().await;
            rooms.remove(id);
            metrics::set_rooms_active(rooms.len());
        }

        debug!(target: "room.hub", room_id = %id, "Room removed");
    }

    async fn generate_room_id(&self) -> Result<String, RoomError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = generate_id(self.settings.room_id_length);
            let taken = self
                .store
                .room_exists(&id)
                .await
                .map_err(|e| RoomError::StoreReadFailed(e.to_string()))?;
            if !taken {
                return Ok(id);
            }
        }

        warn!(
            target: "room.hub",
            attempts = MAX_ID_ATTEMPTS,
            "Could not generate an unused room ID"
        );
        Err(RoomError::IdGenerationFailed)
    }

    fn start_room(self: &Arc<Self>, record: RoomRecord) -> RoomHandle {
        let (handle, _task) = RoomActor::spawn(
            record,
            Arc::downgrade(self),
            Arc::clone(&self.store),
            self.settings.clone(),
        );
        handle
    }
}

/// A disposing room is as good as gone.
fn live(handle: RoomHandle) -> Result<RoomHandle, RoomError> {
    if handle.is_closed() {
        Err(RoomError::RoomNotFound)
    } else {
        Ok(handle)
    }
}
