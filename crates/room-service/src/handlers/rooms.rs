//! Room creation, login and logout handlers.
//!
//! Login exchanges a room password for a session token carried in an
//! HttpOnly cookie; the WebSocket handler resolves that token back to the
//! peer's handle.

use crate::auth::{hash_password, issue_session, verify_password};
use crate::errors::RoomError;
use crate::handlers::DataResponse;
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Minimum room name length when a name is given.
const MIN_ROOM_NAME_LENGTH: usize = 3;

/// Maximum room name length.
const MAX_ROOM_NAME_LENGTH: usize = 100;

/// Minimum room password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum room password length.
const MAX_PASSWORD_LENGTH: usize = 100;

/// Request body for `POST /api/rooms`.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Optional display name; empty means unnamed.
    #[serde(default)]
    pub name: String,

    pub password: SecretString,
}

impl CreateRoomRequest {
    /// Validate name and password bounds.
    pub fn validate(&self) -> Result<(), &'static str> {
        let name_len = self.name.chars().count();
        if name_len != 0 && !(MIN_ROOM_NAME_LENGTH..=MAX_ROOM_NAME_LENGTH).contains(&name_len) {
            return Err("Invalid room name (3 - 100 chars)");
        }

        let password_len = self.password.expose_secret().chars().count();
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password_len) {
            return Err("Invalid password (6 - 100 chars)");
        }

        Ok(())
    }
}

/// Response data for `POST /api/rooms`.
#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub id: String,
}

/// Request body for `POST /api/rooms/:id/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub handle: String,
    pub password: SecretString,
}

impl LoginRequest {
    /// Validate the handle against the configured maximum length.
    pub fn validate(&self, max_handle_length: usize) -> Result<(), &'static str> {
        let len = self.handle.trim().chars().count();
        if len == 0 {
            return Err("Handle is required");
        }
        if len > max_handle_length {
            return Err("Handle is too long");
        }
        Ok(())
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, RoomError> {
    // Parsed by hand so malformed bodies are a 400, not axum's 422
    serde_json::from_slice(body).map_err(|e| {
        debug!(target: "room.http", error = %e, "Invalid request body");
        RoomError::InvalidRequest("Error parsing JSON request".to_string())
    })
}

/// Handler for `POST /api/rooms`.
///
/// Hashes the password, then creates and starts the room in the hub.
#[instrument(skip_all, name = "room.http.create_room")]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<DataResponse<CreateRoomResponse>>, RoomError> {
    let request: CreateRoomRequest = parse_body(&body)?;
    request
        .validate()
        .map_err(|e| RoomError::InvalidRequest(e.to_string()))?;

    let hash = hash_password(
        request.password.expose_secret().to_string(),
        state.config.bcrypt_cost,
    )
    .await?;

    let room = state.hub.add_room(request.name, hash).await?;
    info!(target: "room.http", room_id = %room.id(), "Room created via API");

    Ok(Json(DataResponse::new(CreateRoomResponse {
        id: room.id().to_string(),
    })))
}

/// Handler for `POST /api/rooms/:id/login`.
///
/// Activates the room, checks the password and sets the session cookie.
#[instrument(skip_all, name = "room.http.login", fields(room_id = %room_id))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    jar: CookieJar,
    body: axum::body::Bytes,
) -> Result<(CookieJar, Json<DataResponse<bool>>), RoomError> {
    let request: LoginRequest = parse_body(&body)?;
    request
        .validate(state.config.max_handle_length)
        .map_err(|e| RoomError::InvalidRequest(e.to_string()))?;

    let room = state.hub.activate_room(&room_id).await?;

    let matches = verify_password(
        request.password.expose_secret().to_string(),
        room.password_hash().to_vec(),
    )
    .await?;
    if !matches {
        debug!(target: "room.http", room_id = %room_id, "Incorrect room password");
        return Err(RoomError::Unauthorized("Incorrect password".to_string()));
    }

    let store = state.hub.store();
    let session = issue_session(
        store.as_ref(),
        room.id(),
        request.handle.trim(),
        state.config.room_age,
    )
    .await?;

    let cookie = Cookie::build((state.config.session_cookie.clone(), session.id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict);

    debug!(target: "room.http", room_id = %room_id, "Session issued");
    Ok((jar.add(cookie), Json(DataResponse::new(true))))
}

/// Handler for `DELETE /api/rooms/:id/login`.
///
/// Removes the caller's session, if any, and clears the cookie.
#[instrument(skip_all, name = "room.http.logout", fields(room_id = %room_id))]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DataResponse<bool>>), RoomError> {
    let name = state.config.session_cookie.clone();

    let Some(token) = jar.get(&name).map(|c| c.value().to_string()) else {
        return Ok((jar, Json(DataResponse::new(true))));
    };

    state
        .hub
        .store()
        .remove_session(&token, &room_id)
        .await
        .map_err(|e| RoomError::StoreWriteFailed(e.to_string()))?;

    let jar = jar.remove(Cookie::build((name, "")).path("/"));
    Ok((jar, Json(DataResponse::new(true))))
}
