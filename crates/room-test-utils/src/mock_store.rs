//! Fault-injecting store for hub and handler tests.
//!
//! Wraps a real [`MemoryStore`] and can be configured to:
//! - Report every room ID as taken (exhausts ID generation)
//! - Fail writes (`add_room`, `add_session`, ...)
//! - Fail reads (`get_room`, `room_exists`, `get_session`)
//! - Delay `add_room`, so concurrent creations interleave
//!
//! Call counters let tests assert how often the hub reached the store.
//!
//! # Example
//!
//! ```rust,ignore
//! use room_test_utils::MockStore;
//!
//! let store = MockStore::builder().ids_always_taken().build();
//! let hub = Hub::new(store.clone(), test_settings());
//!
//! assert!(hub.add_room("x".into(), vec![]).await.is_err());
//! assert_eq!(store.room_exists_calls(), 5);
//! ```

use async_trait::async_trait;
use room_service::store::{MemoryStore, RoomRecord, SessionRecord, Store, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Store wrapper with configurable failures and call counters.
#[derive(Default)]
pub struct MockStore {
    inner: MemoryStore,
    ids_always_taken: bool,
    fail_writes: bool,
    fail_reads: bool,
    add_room_delay: Option<Duration>,
    room_exists_calls: AtomicUsize,
    add_room_calls: AtomicUsize,
    extend_calls: AtomicUsize,
    clear_sessions_calls: AtomicUsize,
}

impl MockStore {
    #[must_use]
    pub fn builder() -> MockStoreBuilder {
        MockStoreBuilder::default()
    }

    /// A mock that behaves exactly like `MemoryStore`.
    #[must_use]
    pub fn healthy() -> Arc<Self> {
        Self::builder().build()
    }

    /// Number of `room_exists` calls so far.
    pub fn room_exists_calls(&self) -> usize {
        self.room_exists_calls.load(Ordering::SeqCst)
    }

    /// Number of `add_room` calls so far, including failed ones.
    pub fn add_room_calls(&self) -> usize {
        self.add_room_calls.load(Ordering::SeqCst)
    }

    /// Number of `extend_room_ttl` calls so far.
    pub fn extend_calls(&self) -> usize {
        self.extend_calls.load(Ordering::SeqCst)
    }

    /// Number of `clear_sessions` calls so far.
    pub fn clear_sessions_calls(&self) -> usize {
        self.clear_sessions_calls.load(Ordering::SeqCst)
    }

    /// The wrapped store, for seeding and inspecting state directly.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads {
            return Err(StoreError::Backend("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MockStore {
    async fn add_room(&self, room: RoomRecord, ttl: Duration) -> Result<(), StoreError> {
        self.add_room_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.add_room_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_write()?;
        self.inner.add_room(room, ttl).await
    }

    async fn get_room(&self, id: &str) -> Result<Option<RoomRecord>, StoreError> {
        self.check_read()?;
        self.inner.get_room(id).await
    }

    async fn room_exists(&self, id: &str) -> Result<bool, StoreError> {
        self.room_exists_calls.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        if self.ids_always_taken {
            return Ok(true);
        }
        self.inner.room_exists(id).await
    }

    async fn extend_room_ttl(&self, id: &str, ttl: Duration) -> Result<(), StoreError> {
        self.extend_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.extend_room_ttl(id, ttl).await
    }

    async fn remove_room(&self, id: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.remove_room(id).await
    }

    async fn add_session(
        &self,
        session_id: &str,
        handle: &str,
        room_id: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.add_session(session_id, handle, room_id, ttl).await
    }

    async fn get_session(
        &self,
        session_id: &str,
        room_id: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.check_read()?;
        self.inner.get_session(session_id, room_id).await
    }

    async fn remove_session(&self, session_id: &str, room_id: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.remove_session(session_id, room_id).await
    }

    async fn clear_sessions(&self, room_id: &str) -> Result<(), StoreError> {
        self.clear_sessions_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.clear_sessions(room_id).await
    }
}

/// Builder for [`MockStore`].
#[derive(Debug, Default)]
pub struct MockStoreBuilder {
    ids_always_taken: bool,
    fail_writes: bool,
    fail_reads: bool,
    add_room_delay: Option<Duration>,
}

impl MockStoreBuilder {
    /// Report every candidate room ID as already in use.
    #[must_use]
    pub fn ids_always_taken(mut self) -> Self {
        self.ids_always_taken = true;
        self
    }

    #[must_use]
    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    #[must_use]
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Sleep for `delay` inside every `add_room`.
    #[must_use]
    pub fn slow_add_room(mut self, delay: Duration) -> Self {
        self.add_room_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<MockStore> {
        Arc::new(MockStore {
            ids_always_taken: self.ids_always_taken,
            fail_writes: self.fail_writes,
            fail_reads: self.fail_reads,
            add_room_delay: self.add_room_delay,
            ..MockStore::default()
        })
    }
}
