//! # Room Test Utilities
//!
//! Shared test utilities for the room service.
//!
//! ## Modules
//!
//! - `mock_store` - Fault-injecting `Store` with call counters
//! - `fixtures` - Settings, config and pre-started rooms
//!
//! The in-memory peer transport lives in `room_service::transport::testing`
//! (enabled here through the `test-utils` feature) and is re-exported below.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let test_room = TestRoom::start().await;
//!     let (reader, writer, mut client) = mock_connection();
//!     test_room.room.add_peer("p1".into(), "alice".into(), reader, writer).await;
//!
//!     assert!(client.recv_type("peer.info").await.is_some());
//! }
//! ```

pub mod fixtures;
pub mod mock_store;

pub use fixtures::*;
pub use mock_store::*;
pub use room_service::transport::testing::{mock_connection, ClientEnd};
