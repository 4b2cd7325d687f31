//! Hub behavior against a fault-injecting store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use room_service::actors::{Hub, RoomSettings, MAX_ID_ATTEMPTS};
use room_service::errors::RoomError;
use room_service::store::Store;
use room_test_utils::{test_room_record, test_settings, MockStore};
use std::sync::Arc;
use std::time::Duration;

fn hub_over(store: &Arc<MockStore>) -> Arc<Hub> {
    let store_dyn: Arc<dyn Store> = store.clone();
    Hub::new(store_dyn, test_settings())
}

#[tokio::test]
async fn test_id_generation_gives_up_after_bounded_attempts() {
    let store = MockStore::builder().ids_always_taken().build();
    let hub = hub_over(&store);

    let err = hub.add_room("x".into(), b"h".to_vec()).await.unwrap_err();

    assert!(matches!(err, RoomError::IdGenerationFailed));
    assert_eq!(store.room_exists_calls(), MAX_ID_ATTEMPTS);
    assert_eq!(store.add_room_calls(), 0);
    assert_eq!(hub.room_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_creations_respect_room_limit() {
    let store = MockStore::builder()
        .slow_add_room(Duration::from_millis(50))
        .build();
    let store_dyn: Arc<dyn Store> = store.clone();
    let hub = Hub::new(
        store_dyn,
        RoomSettings {
            max_rooms: 1,
            ..test_settings()
        },
    );

    // Both pass the early limit check before either finishes persisting.
    let (first, second) = tokio::join!(
        hub.add_room("one".into(), b"h".to_vec()),
        hub.add_room("two".into(), b"h".to_vec()),
    );

    assert_eq!(store.add_room_calls(), 2);
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(RoomError::RoomLimitReached))));
    assert_eq!(hub.room_count().await, 1);
    // The losing creation does not leave its record behind.
    assert_eq!(store.inner().len().await, 1);
}

#[tokio::test]
async fn test_failed_persist_starts_no_room() {
    let store = MockStore::builder().fail_writes().build();
    let hub = hub_over(&store);

    let err = hub.add_room("x".into(), b"h".to_vec()).await.unwrap_err();

    assert!(matches!(err, RoomError::StoreWriteFailed(_)));
    assert_eq!(store.add_room_calls(), 1);
    assert_eq!(hub.room_count().await, 0);
}

#[tokio::test]
async fn test_read_failures_surface_as_store_read_errors() {
    let store = MockStore::builder().fail_reads().build();
    let hub = hub_over(&store);

    assert!(matches!(
        hub.add_room("x".into(), b"h".to_vec()).await,
        Err(RoomError::StoreReadFailed(_))
    ));
    assert!(matches!(
        hub.activate_room("anything").await,
        Err(RoomError::StoreReadFailed(_))
    ));
}

#[tokio::test]
async fn test_activation_starts_stored_room() {
    let store = MockStore::healthy();
    store
        .inner()
        .add_room(test_room_record("seeded"), Duration::from_secs(60))
        .await
        .unwrap();
    let hub = hub_over(&store);

    assert!(hub.get_room("seeded").await.is_none());

    let room = hub.activate_room("seeded").await.unwrap();
    assert_eq!(room.id(), "seeded");
    assert!(hub.get_room("seeded").await.unwrap().same_room(&room));
}

#[tokio::test]
async fn test_dispose_clears_sessions_and_deregisters() {
    let store = MockStore::healthy();
    let hub = hub_over(&store);

    let room = hub.add_room(String::new(), b"h".to_vec()).await.unwrap();
    let id = room.id().to_string();
    store
        .add_session("s1", "alice", &id, Duration::from_secs(60))
        .await
        .unwrap();

    room.dispose();
    room.dispose();

    for _ in 0..100 {
        if hub.get_room(&id).await.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(hub.get_room(&id).await.is_none());
    assert_eq!(store.clear_sessions_calls(), 1, "disposal runs once");
    assert!(store.get_session("s1", &id).await.unwrap().is_none());
    assert!(!store.room_exists(&id).await.unwrap());
}
