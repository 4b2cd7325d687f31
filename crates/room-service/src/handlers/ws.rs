//! WebSocket upgrade handler.
//!
//! A peer may only connect with a session cookie issued by a login to the
//! same room. After the upgrade the socket is split into reader and writer
//! halves and handed to the room actor, which owns them from then on.

use crate::errors::RoomError;
use crate::routes::AppState;
use crate::transport::websocket;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Handler for `GET /ws/:id`.
///
/// The upgrade extractor is taken as a `Result` so that session and room
/// checks answer first; a request that is not a WebSocket upgrade only sees
/// the upgrade rejection once it is authorized.
#[instrument(skip_all, name = "room.http.connect", fields(room_id = %room_id))]
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    jar: CookieJar,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, RoomError> {
    let token = jar
        .get(&state.config.session_cookie)
        .map(|c| c.value().to_string())
        .ok_or_else(|| RoomError::Unauthorized("Invalid session".to_string()))?;

    let room = state.hub.activate_room(&room_id).await?;

    let session = state
        .hub
        .store()
        .get_session(&token, &room_id)
        .await
        .map_err(|e| RoomError::StoreReadFailed(e.to_string()))?
        .ok_or_else(|| RoomError::Unauthorized("Invalid session".to_string()))?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    debug!(target: "room.http", room_id = %room_id, "Upgrading peer connection");

    let limit = state.config.max_message_length;
    Ok(ws
        .max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| async move {
            let (reader, writer) = websocket::split(socket);
            room.add_peer(session.id, session.handle, reader, writer)
                .await;
        }))
}
