//! Actor model for chat rooms.
//!
//! ```text
//! Hub (registry, one per process, shared as Arc<Hub>)
//! └── RoomActor (one task per active room, owns all room state)
//!     └── Peer duties (two tasks per connection)
//!         ├── read: frames -> room requests / broadcasts
//!         └── write: mailbox -> frames
//! ```
//!
//! Room state is only ever touched by its own event loop. Peers and HTTP
//! handlers talk to a room through a cloneable [`RoomHandle`]; the room talks
//! to each peer through that peer's bounded outbound mailbox.

use std::time::Duration;

pub mod hub;
pub mod messages;
pub mod peer;
pub mod room;

pub use hub::{Hub, MAX_ID_ATTEMPTS};
pub use messages::{DisposeReason, LeaveReason, MessageType};
pub use room::{RoomActor, RoomHandle};

/// Tunables shared by the hub, every room and every peer.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Length of generated room IDs.
    pub room_id_length: usize,
    /// Replay cache capacity (0 disables replay).
    pub max_cached_messages: usize,
    /// Bound on each outbound write.
    pub ws_timeout: Duration,
    /// Outbound mailbox capacity per peer.
    pub max_message_queue: usize,
    /// Rate limit window.
    pub rate_limit_interval: Duration,
    /// Messages allowed per window.
    pub rate_limit_messages: u64,
    /// Maximum concurrently active rooms.
    pub max_rooms: usize,
    /// Maximum peers in one room.
    pub max_peers_per_room: usize,
    /// Idle period after which a room disposes itself.
    pub room_timeout: Duration,
    /// TTL of persisted room and session records.
    pub room_age: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            room_id_length: 10,
            max_cached_messages: 50,
            ws_timeout: Duration::from_secs(5),
            max_message_queue: 32,
            rate_limit_interval: Duration::from_secs(1),
            rate_limit_messages: 10,
            max_rooms: 1000,
            max_peers_per_room: 50,
            room_timeout: Duration::from_secs(1200),
            room_age: Duration::from_secs(86_400),
        }
    }
}
