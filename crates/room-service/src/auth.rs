//! Room passwords and peer sessions.
//!
//! Passwords are hashed with bcrypt on the blocking pool; the room actor only
//! ever sees the opaque hash. A successful login issues a random session
//! token stored with the room's TTL; the WebSocket upgrade later resolves
//! the token back to the peer's handle.

use crate::errors::RoomError;
use crate::store::{SessionRecord, Store};
use common::ids::generate_id;
use std::time::Duration;
use tracing::{error, instrument};

/// Length of issued session tokens.
pub const SESSION_ID_LENGTH: usize = 32;

/// Hash a room password.
///
/// # Errors
///
/// `RoomError::Internal` if hashing fails or the blocking task panics.
pub async fn hash_password(password: String, cost: u32) -> Result<Vec<u8>, RoomError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| RoomError::Internal(format!("hash task failed: {e}")))?
        .map(String::into_bytes)
        .map_err(|e| {
            error!(target: "room.http", error = %e, "Password hashing failed");
            RoomError::Internal(format!("bcrypt hash failed: {e}"))
        })
}

/// Check a password against a stored hash.
///
/// A malformed stored hash counts as a mismatch.
///
/// # Errors
///
/// `RoomError::Internal` if the blocking task panics.
pub async fn verify_password(password: String, hash: Vec<u8>) -> Result<bool, RoomError> {
    tokio::task::spawn_blocking(move || {
        let Ok(hash) = std::str::from_utf8(&hash) else {
            return false;
        };
        bcrypt::verify(password, hash).unwrap_or(false)
    })
    .await
    .map_err(|e| RoomError::Internal(format!("verify task failed: {e}")))
}

/// Issue and store a new session for `handle` in `room_id`.
///
/// # Errors
///
/// `RoomError::StoreWriteFailed` if the session could not be stored.
#[instrument(skip_all, fields(room_id = %room_id))]
pub async fn issue_session(
    store: &dyn Store,
    room_id: &str,
    handle: &str,
    ttl: Duration,
) -> Result<SessionRecord, RoomError> {
    let id = generate_id(SESSION_ID_LENGTH);
    store
        .add_session(&id, handle, room_id, ttl)
        .await
        .map_err(|e| RoomError::StoreWriteFailed(e.to_string()))?;

    Ok(SessionRecord {
        id,
        handle: handle.to_string(),
    })
}
