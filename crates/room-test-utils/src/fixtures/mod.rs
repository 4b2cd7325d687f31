//! Pre-configured test data for room service tests.
//!
//! - [`test_settings`]: room settings with timers long enough not to fire
//! - [`test_config`]: service config using the memory store and cheapest bcrypt
//! - [`test_room_record`]: a room record with a known password
//! - [`TestRoom`]: a hub plus one started room, ready for peers

use chrono::Utc;
use room_service::actors::{Hub, RoomHandle, RoomSettings};
use room_service::config::{Config, MIN_BCRYPT_COST};
use room_service::store::{MemoryStore, RoomRecord, Store};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Password used by [`test_room_record`] and [`TestRoom`].
pub const TEST_PASSWORD: &str = "correct-horse";

/// Room settings for tests: idle timeout and TTL far in the future.
#[must_use]
pub fn test_settings() -> RoomSettings {
    RoomSettings {
        room_timeout: Duration::from_secs(3600),
        room_age: Duration::from_secs(3600),
        ws_timeout: Duration::from_secs(1),
        ..RoomSettings::default()
    }
}

/// Service config for HTTP tests.
///
/// # Panics
///
/// Panics if the default config fails validation.
#[must_use]
pub fn test_config() -> Config {
    let vars = HashMap::from([(
        "HUSH_BCRYPT_COST".to_string(),
        MIN_BCRYPT_COST.to_string(),
    )]);
    Config::from_vars(&vars).expect("test config should be valid")
}

/// A room record whose hash matches [`TEST_PASSWORD`].
///
/// # Panics
///
/// Panics if bcrypt hashing fails.
#[must_use]
pub fn test_room_record(id: &str) -> RoomRecord {
    RoomRecord {
        id: id.to_string(),
        name: "Test Room".to_string(),
        password_hash: bcrypt::hash(TEST_PASSWORD, MIN_BCRYPT_COST)
            .expect("bcrypt hash")
            .into_bytes(),
        created_at: Utc::now(),
    }
}

/// A hub backed by a fresh `MemoryStore` with one started room.
pub struct TestRoom {
    pub hub: Arc<Hub>,
    pub store: Arc<MemoryStore>,
    pub room: RoomHandle,
}

impl TestRoom {
    /// Start a room with [`test_settings`].
    pub async fn start() -> Self {
        Self::with_settings(test_settings()).await
    }

    /// Start a room with custom settings.
    ///
    /// # Panics
    ///
    /// Panics if the room cannot be created.
    pub async fn with_settings(settings: RoomSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let store_dyn: Arc<dyn Store> = store.clone();
        let hub = Hub::new(store_dyn, settings);

        let hash = bcrypt::hash(TEST_PASSWORD, MIN_BCRYPT_COST)
            .expect("bcrypt hash")
            .into_bytes();
        let room = hub
            .add_room("Test Room".to_string(), hash)
            .await
            .expect("room should be created");

        Self { hub, store, room }
    }

    /// Room ID.
    pub fn id(&self) -> &str {
        self.room.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_record_password_matches() {
        let record = test_room_record("r1");
        let hash = String::from_utf8(record.password_hash).unwrap();
        assert!(bcrypt::verify(TEST_PASSWORD, &hash).unwrap());
    }

    #[test]
    fn test_config_uses_memory_store() {
        let config = test_config();
        assert_eq!(config.bcrypt_cost, MIN_BCRYPT_COST);
        assert_eq!(
            config.store_backend,
            room_service::config::StoreBackend::Memory
        );
    }

    #[tokio::test]
    async fn test_room_is_registered() {
        let test_room = TestRoom::start().await;
        assert!(test_room.hub.get_room(test_room.id()).await.is_some());
        assert!(test_room.store.room_exists(test_room.id()).await.unwrap());
    }
}
