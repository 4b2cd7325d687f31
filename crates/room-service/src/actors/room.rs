//! `RoomActor` - single owner of one chat room's live state.
//!
//! Each room is one tokio task draining three channels:
//!
//! - peer requests (join, leave, roster, count), buffer 100
//! - broadcasts, buffer 100
//! - dispose signal, capacity 1
//!
//! plus an idle timer that is re-armed on every loop iteration, so any event
//! postpones disposal by `room_timeout`.
//!
//! # Delivery
//!
//! Fanout writes into each peer's bounded mailbox with a blocking send. A peer
//! whose writer stalls therefore stalls the whole room until its write times
//! out and the writer gives up. Dropping messages for slow peers is not
//! attempted.
//!
//! Broadcasts are drained before peer requests. A read duty queues its
//! broadcasts before its leave, so a peer's own messages always reach the
//! room (and the replay cache) ahead of its `peer.leave`.
//!
//! # Disposal
//!
//! Explicit, peer-requested or idle disposal all run the same path: mark the
//! room closed, clear its sessions, signal every write duty to close with
//! "room disposed", then deregister from the hub (which deletes the stored
//! record). The close signal bypasses the mailbox, so a backlogged peer still
//! gets the reason. Once closed,
//! the handle silently drops new input.

use super::hub::Hub;
use super::messages::{
    make_payload, Broadcast, DisposeReason, LeaveReason, MessageType, Outbound, PeerData,
    PeerRequest, PendingPeer, Payload,
};
use super::peer::{self, PeerContext};
use super::RoomSettings;
use crate::errors::RoomError;
use crate::observability::metrics;
use crate::store::{RoomRecord, Store};
use crate::transport::{BoxedReader, BoxedWriter, Frame};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Buffer size of the peer request channel.
const PEER_CHANNEL_BUFFER: usize = 100;

/// Buffer size of the broadcast channel.
const BROADCAST_CHANNEL_BUFFER: usize = 100;

/// Minimum time between two TTL extensions of the stored room.
pub const TTL_EXTEND_INTERVAL: Duration = Duration::from_secs(30);

/// Close reason sent to every peer on disposal.
pub const CLOSE_REASON_DISPOSED: &str = "room disposed";

/// Notice carried by the `room.full` frame.
const ROOM_FULL_NOTICE: &str = "room is full";

/// Immutable room identity plus the closed flag, shared by all handles.
#[derive(Debug)]
struct RoomShared {
    id: String,
    name: String,
    password_hash: Vec<u8>,
    created_at: DateTime<Utc>,
    closed: AtomicBool,
}

/// Handle to a `RoomActor`.
///
/// Cheap to clone. All sends become no-ops once the room started disposing.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    shared: Arc<RoomShared>,
    peer_tx: mpsc::Sender<PeerRequest>,
    broadcast_tx: mpsc::Sender<Broadcast>,
    dispose_tx: mpsc::Sender<DisposeReason>,
}

impl RoomHandle {
    /// Room ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Display name (may be empty).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// bcrypt hash of the room password.
    #[must_use]
    pub fn password_hash(&self) -> &[u8] {
        &self.shared.password_hash
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.shared.created_at
    }

    /// Whether disposal has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same actor.
    #[must_use]
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Queue a connection for admission.
    ///
    /// `id` is the peer's opaque ID (its session ID) and `handle` its display
    /// name. Admission or rejection happens asynchronously in the room loop.
    pub async fn add_peer(
        &self,
        id: String,
        handle: String,
        reader: BoxedReader,
        writer: BoxedWriter,
    ) {
        self.send_peer_request(PeerRequest::Join(PendingPeer {
            id,
            handle,
            reader,
            writer,
        }))
        .await;
    }

    /// Queue a payload for fanout to every peer.
    pub async fn broadcast(&self, message_type: MessageType, payload: Payload) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self
            .broadcast_tx
            .send(Broadcast {
                message_type,
                payload,
            })
            .await
        {
            debug!(target: "room.actor.room", room_id = %self.id(), error = %e, "Broadcast dropped");
        }
    }

    /// Dispose the room.
    pub fn dispose(&self) {
        self.request_dispose(DisposeReason::Explicit);
    }

    /// Number of admitted peers.
    ///
    /// # Errors
    ///
    /// `RoomError::RoomNotFound` if the room is closed or its loop has exited.
    pub async fn peer_count(&self) -> Result<usize, RoomError> {
        if self.is_closed() {
            return Err(RoomError::RoomNotFound);
        }
        let (tx, rx) = oneshot::channel();
        self.peer_tx
            .send(PeerRequest::PeerCount { respond_to: tx })
            .await
            .map_err(|_| RoomError::RoomNotFound)?;

        rx.await.map_err(|_| RoomError::RoomNotFound)
    }

    pub(crate) fn request_dispose(&self, reason: DisposeReason) {
        if self.is_closed() {
            return;
        }
        // Capacity 1: a pending dispose already covers this one.
        let _ = self.dispose_tx.try_send(reason);
    }

    pub(crate) async fn leave(&self, conn_id: Uuid, reason: LeaveReason) {
        self.send_peer_request(PeerRequest::Leave { conn_id, reason })
            .await;
    }

    pub(crate) async fn request_list(&self, conn_id: Uuid) {
        self.send_peer_request(PeerRequest::List { conn_id }).await;
    }

    async fn send_peer_request(&self, request: PeerRequest) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.peer_tx.send(request).await {
            debug!(target: "room.actor.room", room_id = %self.id(), error = %e, "Peer request dropped");
        }
    }
}

/// An admitted peer, as seen by the room.
struct ConnectedPeer {
    id: String,
    handle: String,
    mailbox: mpsc::Sender<Outbound>,
    /// Out-of-band close for the write duty, used on disposal.
    close: oneshot::Sender<String>,
}

impl ConnectedPeer {
    fn data(&self) -> PeerData {
        PeerData {
            id: self.id.clone(),
            handle: self.handle.clone(),
        }
    }
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    handle: RoomHandle,
    hub: Weak<Hub>,
    store: Arc<dyn Store>,
    settings: RoomSettings,
    peer_rx: mpsc::Receiver<PeerRequest>,
    broadcast_rx: mpsc::Receiver<Broadcast>,
    dispose_rx: mpsc::Receiver<DisposeReason>,
    /// Admitted peers by connection ID.
    peers: HashMap<Uuid, ConnectedPeer>,
    /// Last recordable broadcasts, oldest first.
    cache: VecDeque<Payload>,
    last_ttl_extension: Instant,
}

impl RoomActor {
    /// Spawn a room actor for a stored room.
    ///
    /// Returns the handle and the task's join handle. The task ends after
    /// disposal.
    pub fn spawn(
        record: RoomRecord,
        hub: Weak<Hub>,
        store: Arc<dyn Store>,
        settings: RoomSettings,
    ) -> (RoomHandle, JoinHandle<()>) {
        let (peer_tx, peer_rx) = mpsc::channel(PEER_CHANNEL_BUFFER);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_CHANNEL_BUFFER);
        let (dispose_tx, dispose_rx) = mpsc::channel(1);

        let handle = RoomHandle {
            shared: Arc::new(RoomShared {
                id: record.id,
                name: record.name,
                password_hash: record.password_hash,
                created_at: record.created_at,
                closed: AtomicBool::new(false),
            }),
            peer_tx,
            broadcast_tx,
            dispose_tx,
        };

        let actor = Self {
            handle: handle.clone(),
            hub,
            store,
            cache: VecDeque::with_capacity(settings.max_cached_messages),
            settings,
            peer_rx,
            broadcast_rx,
            dispose_rx,
            peers: HashMap::new(),
            last_ttl_extension: Instant::now(),
        };

        let task = tokio::spawn(actor.run());
        (handle, task)
    }

    fn id(&self) -> &str {
        self.handle.id()
    }

    /// Run the room event loop.
    #[instrument(skip_all, name = "room.actor.room", fields(room_id = %self.handle.id()))]
    async fn run(mut self) {
        info!(target: "room.actor.room", room_id = %self.id(), "Room started");

        let reason = loop {
            tokio::select! {
                biased;

                reason = self.dispose_rx.recv() => {
                    // The actor holds a sender itself, so this never yields None.
                    break reason.unwrap_or(DisposeReason::Explicit);
                }

                Some(broadcast) = self.broadcast_rx.recv() => {
                    self.handle_broadcast(broadcast).await;
                }

                Some(request) = self.peer_rx.recv() => {
                    self.handle_peer_request(request).await;
                }

                () = tokio::time::sleep(self.settings.room_timeout) => {
                    debug!(target: "room.actor.room", room_id = %self.id(), "Room idle timeout");
                    break DisposeReason::Idle;
                }
            }
        };

        self.dispose(reason).await;
    }

    async fn handle_peer_request(&mut self, request: PeerRequest) {
        match request {
            PeerRequest::Join(pending) => self.join(pending).await,
            PeerRequest::Leave { conn_id, reason } => self.leave(conn_id, reason).await,
            PeerRequest::List { conn_id } => self.send_peer_list(conn_id).await,
            PeerRequest::PeerCount { respond_to } => {
                let _ = respond_to.send(self.peers.len());
            }
        }
    }

    async fn join(&mut self, pending: PendingPeer) {
        let PendingPeer {
            id,
            handle,
            reader,
            writer,
        } = pending;

        if self.peers.len() >= self.settings.max_peers_per_room {
            info!(
                target: "room.actor.room",
                room_id = %self.id(),
                max_peers = self.settings.max_peers_per_room,
                "Room full, rejecting peer"
            );
            metrics::record_join_rejected();
            // Off the loop: a slow client must not stall the room here.
            tokio::spawn(reject_full(writer, self.settings.ws_timeout));
            drop(reader);
            return;
        }

        let conn_id = Uuid::new_v4();
        let (mailbox_tx, mailbox_rx) = mpsc::channel(self.settings.max_message_queue);
        let (close_tx, close_rx) = oneshot::channel();

        let peer = ConnectedPeer {
            id: id.clone(),
            handle: handle.clone(),
            mailbox: mailbox_tx.clone(),
            close: close_tx,
        };
        let peer_data = peer.data();
        self.peers.insert(conn_id, peer);
        metrics::peer_connected();

        peer::spawn_duties(
            PeerContext {
                conn_id,
                id,
                handle,
                room: self.handle.clone(),
                store: Arc::clone(&self.store),
                rate_limit_interval: self.settings.rate_limit_interval,
                rate_limit_messages: self.settings.rate_limit_messages,
            },
            reader,
            writer,
            mailbox_rx,
            close_rx,
            self.settings.ws_timeout,
        );

        let info = make_payload(MessageType::PeerInfo, &peer_data);
        let _ = mailbox_tx.send(Outbound::Payload(info)).await;

        for payload in &self.cache {
            if mailbox_tx
                .send(Outbound::Payload(Arc::clone(payload)))
                .await
                .is_err()
            {
                break;
            }
        }

        debug!(
            target: "room.actor.room",
            room_id = %self.id(),
            conn_id = %conn_id,
            peers = self.peers.len(),
            replayed = self.cache.len(),
            "Peer joined"
        );

        let join = make_payload(MessageType::PeerJoin, &peer_data);
        self.fanout(MessageType::PeerJoin, join).await;
    }

    async fn leave(&mut self, conn_id: Uuid, reason: LeaveReason) {
        let Some(peer) = self.peers.remove(&conn_id) else {
            return;
        };
        metrics::peer_disconnected(1);

        if reason == LeaveReason::RateLimited {
            let _ = peer
                .mailbox
                .send(Outbound::Close(MessageType::PeerRateLimited.as_str().to_string()))
                .await;
        }

        let peer_data = peer.data();
        // Dropping the last sender makes the write duty close the connection.
        drop(peer);

        debug!(
            target: "room.actor.room",
            room_id = %self.id(),
            conn_id = %conn_id,
            reason = ?reason,
            peers = self.peers.len(),
            "Peer left"
        );

        let leave = make_payload(MessageType::PeerLeave, &peer_data);
        self.fanout(MessageType::PeerLeave, leave).await;
    }

    async fn send_peer_list(&mut self, conn_id: Uuid) {
        let Some(requester) = self.peers.get(&conn_id) else {
            return;
        };

        let roster: Vec<PeerData> = self.peers.values().map(ConnectedPeer::data).collect();
        let payload = make_payload(MessageType::PeerList, &roster);
        let _ = requester.mailbox.send(Outbound::Payload(payload)).await;
    }

    async fn handle_broadcast(&mut self, broadcast: Broadcast) {
        self.fanout(broadcast.message_type, broadcast.payload).await;
        self.maybe_extend_ttl().await;
    }

    /// Deliver to every peer in turn, then record if recordable.
    async fn fanout(&mut self, message_type: MessageType, payload: Payload) {
        for peer in self.peers.values() {
            // A closed mailbox means the write duty already gave up; the
            // read duty will send the leave.
            let _ = peer
                .mailbox
                .send(Outbound::Payload(Arc::clone(&payload)))
                .await;
        }
        metrics::record_broadcast(message_type.as_str());

        if message_type.is_recordable() {
            self.record(payload);
        }
    }

    fn record(&mut self, payload: Payload) {
        let capacity = self.settings.max_cached_messages;
        if capacity == 0 {
            return;
        }
        while self.cache.len() >= capacity {
            self.cache.pop_front();
        }
        self.cache.push_back(payload);
    }

    async fn maybe_extend_ttl(&mut self) {
        if self.last_ttl_extension.elapsed() < TTL_EXTEND_INTERVAL {
            return;
        }
        self.last_ttl_extension = Instant::now();

        let id = self.handle.id().to_string();
        if let Err(e) = self
            .store
            .extend_room_ttl(&id, self.settings.room_age)
            .await
        {
            warn!(
                target: "room.actor.room",
                room_id = %id,
                error = %e,
                "Failed to extend room TTL"
            );
        }
    }

    async fn dispose(mut self, reason: DisposeReason) {
        self.handle.shared.closed.store(true, Ordering::SeqCst);
        let id = self.handle.id().to_string();

        info!(
            target: "room.actor.room",
            room_id = %id,
            reason = reason.as_str(),
            peers = self.peers.len(),
            "Disposing room"
        );

        if let Err(e) = self.store.clear_sessions(&id).await {
            warn!(target: "room.actor.room", room_id = %id, error = %e, "Failed to clear sessions");
        }

        let disconnected = self.peers.len();
        for (_, peer) in self.peers.drain() {
            // Err only if the write duty already exited.
            let _ = peer.close.send(CLOSE_REASON_DISPOSED.to_string());
        }
        metrics::peer_disconnected(disconnected);

        // Joins that were queued behind the dispose never get admitted.
        self.peer_rx.close();
        while let Ok(request) = self.peer_rx.try_recv() {
            if let PeerRequest::Join(pending) = request {
                tokio::spawn(close_pending(pending.writer, self.settings.ws_timeout));
            }
        }
        self.broadcast_rx.close();

        match self.hub.upgrade() {
            Some(hub) => hub.remove_room(&id).await,
            None => {
                if let Err(e) = self.store.remove_room(&id).await {
                    warn!(target: "room.actor.room", room_id = %id, error = %e, "Failed to remove room");
                }
            }
        }

        metrics::record_room_disposed(reason.as_str());
        info!(target: "room.actor.room", room_id = %id, "Room disposed");
    }
}

async fn reject_full(mut writer: BoxedWriter, ws_timeout: Duration) {
    let notice = make_payload(MessageType::RoomFull, &ROOM_FULL_NOTICE);
    let _ = tokio::time::timeout(ws_timeout, async {
        writer.send(Frame::Text(notice.to_string())).await?;
        writer
            .send(Frame::Close(Some(MessageType::RoomFull.as_str().to_string())))
            .await
    })
    .await;
}

async fn close_pending(mut writer: BoxedWriter, ws_timeout: Duration) {
    let _ = tokio::time::timeout(
        ws_timeout,
        writer.send(Frame::Close(Some(CLOSE_REASON_DISPOSED.to_string()))),
    )
    .await;
}
