//! Message types for the room and peer actors.
//!
//! Two families live here:
//!
//! - Wire types: the `{type, timestamp, data}` envelope written to clients
//!   and the `{type, data}` frame read from them.
//! - Mailbox types: requests sent to a room's event loop and the items queued
//!   in a peer's outbound mailbox.

use crate::transport::{BoxedReader, BoxedWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Wire message tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "typing")]
    Typing,
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "peer.list")]
    PeerList,
    #[serde(rename = "peer.info")]
    PeerInfo,
    #[serde(rename = "peer.join")]
    PeerJoin,
    #[serde(rename = "peer.leave")]
    PeerLeave,
    #[serde(rename = "peer.ratelimited")]
    PeerRateLimited,
    #[serde(rename = "room.dispose")]
    RoomDispose,
    #[serde(rename = "room.full")]
    RoomFull,
    #[serde(rename = "notice")]
    Notice,
    #[serde(rename = "handle")]
    Handle,
}

impl MessageType {
    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageType::Typing => "typing",
            MessageType::Message => "message",
            MessageType::PeerList => "peer.list",
            MessageType::PeerInfo => "peer.info",
            MessageType::PeerJoin => "peer.join",
            MessageType::PeerLeave => "peer.leave",
            MessageType::PeerRateLimited => "peer.ratelimited",
            MessageType::RoomDispose => "room.dispose",
            MessageType::RoomFull => "room.full",
            MessageType::Notice => "notice",
            MessageType::Handle => "handle",
        }
    }

    /// Whether broadcasts of this type are kept in the replay cache.
    #[must_use]
    pub const fn is_recordable(&self) -> bool {
        matches!(
            self,
            MessageType::Message | MessageType::PeerJoin | MessageType::PeerLeave
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized wire tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessageType(pub String);

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "typing" => Ok(MessageType::Typing),
            "message" => Ok(MessageType::Message),
            "peer.list" => Ok(MessageType::PeerList),
            "peer.info" => Ok(MessageType::PeerInfo),
            "peer.join" => Ok(MessageType::PeerJoin),
            "peer.leave" => Ok(MessageType::PeerLeave),
            "peer.ratelimited" => Ok(MessageType::PeerRateLimited),
            "room.dispose" => Ok(MessageType::RoomDispose),
            "room.full" => Ok(MessageType::RoomFull),
            "notice" => Ok(MessageType::Notice),
            "handle" => Ok(MessageType::Handle),
            other => Err(UnknownMessageType(other.to_string())),
        }
    }
}

/// Outbound envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    pub data: &'a T,
}

/// Inbound client frame. `data` is free-form; chat text is a string.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `{id, handle}` payload of peer events and roster entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerData {
    pub id: String,
    pub handle: String,
}

/// Chat message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatData {
    pub peer_id: String,
    pub peer_handle: String,
    pub message: String,
}

/// A serialized, shareable outbound payload.
///
/// Fanout clones the `Arc`, not the bytes.
pub type Payload = Arc<str>;

/// Serialize an envelope stamped with the current time.
///
/// Serialization of these plain structs cannot fail in practice; if it ever
/// does, an empty object is sent rather than tearing down the room.
pub fn make_payload<T: Serialize>(message_type: MessageType, data: &T) -> Payload {
    let envelope = Envelope {
        message_type,
        timestamp: Utc::now(),
        data,
    };
    match serde_json::to_string(&envelope) {
        Ok(json) => Arc::from(json),
        Err(e) => {
            tracing::error!(
                target: "room.actor.room",
                error = %e,
                message_type = %message_type,
                "Failed to serialize envelope"
            );
            Arc::from("{}")
        }
    }
}

/// Why a peer is leaving its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// Read error, close frame or end of stream.
    Disconnected,
    /// Evicted by the rate limiter.
    RateLimited,
}

/// Why a room is being disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeReason {
    /// `RoomHandle::dispose` called by the service.
    Explicit,
    /// A peer sent `room.dispose`.
    PeerRequested,
    /// No events for `room_timeout`.
    Idle,
}

impl DisposeReason {
    /// Returns the reason as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DisposeReason::Explicit => "explicit",
            DisposeReason::PeerRequested => "peer",
            DisposeReason::Idle => "idle",
        }
    }
}

/// A connection waiting to be admitted.
pub struct PendingPeer {
    /// Opaque peer ID (the session ID).
    pub id: String,
    pub handle: String,
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl fmt::Debug for PendingPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPeer")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Requests handled by a room's event loop.
#[derive(Debug)]
pub enum PeerRequest {
    /// Admit a new connection.
    Join(PendingPeer),

    /// Remove a peer. `conn_id` distinguishes reconnects under one session.
    Leave { conn_id: Uuid, reason: LeaveReason },

    /// Send the roster to one peer.
    List { conn_id: Uuid },

    /// Report the number of admitted peers.
    PeerCount { respond_to: oneshot::Sender<usize> },
}

/// A payload queued for fanout.
#[derive(Debug)]
pub struct Broadcast {
    pub message_type: MessageType,
    pub payload: Payload,
}

/// Items in a peer's outbound mailbox.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Serialized envelope to write as a text frame.
    Payload(Payload),
    /// Write a close frame with this reason and stop.
    Close(String),
}
