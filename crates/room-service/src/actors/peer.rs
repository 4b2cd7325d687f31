//! Peer duties: the two tasks that serve one admitted connection.
//!
//! - The read duty decodes inbound frames, applies the rate limit and turns
//!   them into room requests or broadcasts. When the connection ends it asks
//!   the room to remove the peer.
//! - The write duty drains the peer's outbound mailbox onto the connection,
//!   bounding each write by `ws_timeout`. A close signal from the room takes
//!   priority over anything still queued.
//!
//! Neither duty touches room state directly; everything goes through the
//! [`RoomHandle`].

use super::messages::{
    make_payload, ChatData, ClientFrame, DisposeReason, LeaveReason, MessageType, Outbound,
    PeerData,
};
use super::room::RoomHandle;
use crate::observability::metrics;
use crate::store::Store;
use crate::transport::{BoxedReader, BoxedWriter, Frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

/// Per-peer chat rate limiter.
///
/// Every `limit`-th message must arrive at least `interval` after the message
/// before it, otherwise the peer is evicted.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    limit: u64,
    num_messages: u64,
    last_message: Option<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(interval: Duration, limit: u64) -> Self {
        Self {
            interval,
            // A zero limit would make every message a boundary.
            limit: limit.max(1),
            num_messages: 0,
            last_message: None,
        }
    }

    /// Check a message arriving at `now`. Accepted messages update the counters.
    ///
    /// Returns `false` if the message must be rejected.
    pub fn check(&mut self, now: Instant) -> bool {
        if self.num_messages > 0 && self.num_messages % self.limit == 0 {
            if let Some(last) = self.last_message {
                if now.saturating_duration_since(last) < self.interval {
                    return false;
                }
            }
        }

        self.num_messages += 1;
        self.last_message = Some(now);
        true
    }

    #[must_use]
    pub fn num_messages(&self) -> u64 {
        self.num_messages
    }
}

/// What a read duty needs to know about its peer and room.
pub(crate) struct PeerContext {
    pub conn_id: Uuid,
    pub id: String,
    pub handle: String,
    pub room: RoomHandle,
    pub store: Arc<dyn Store>,
    pub rate_limit_interval: Duration,
    pub rate_limit_messages: u64,
}

enum Flow {
    Continue,
    Leave(LeaveReason),
}

/// Spawn the read and write duties for an admitted peer.
pub(crate) fn spawn_duties(
    ctx: PeerContext,
    reader: BoxedReader,
    writer: BoxedWriter,
    mailbox: mpsc::Receiver<Outbound>,
    close: oneshot::Receiver<String>,
    ws_timeout: Duration,
) {
    tokio::spawn(run_writer(writer, mailbox, close, ws_timeout, ctx.conn_id));
    tokio::spawn(run_reader(reader, ctx));
}

/// Read duty.
#[instrument(skip_all, name = "room.actor.peer", fields(room_id = %ctx.room.id(), conn_id = %ctx.conn_id))]
pub(crate) async fn run_reader(mut reader: BoxedReader, ctx: PeerContext) {
    let mut limiter = RateLimiter::new(ctx.rate_limit_interval, ctx.rate_limit_messages);

    let reason = loop {
        match reader.next_frame().await {
            Ok(Some(Frame::Text(text))) => {
                if let Flow::Leave(reason) = handle_text(&ctx, &mut limiter, &text).await {
                    break reason;
                }
            }
            Ok(Some(Frame::Close(_))) | Ok(None) => {
                debug!(target: "room.actor.peer", "Connection closed by peer");
                break LeaveReason::Disconnected;
            }
            Err(e) => {
                debug!(target: "room.actor.peer", error = %e, "Read failed");
                break LeaveReason::Disconnected;
            }
        }
    };

    ctx.room.leave(ctx.conn_id, reason).await;
}

async fn handle_text(ctx: &PeerContext, limiter: &mut RateLimiter, text: &str) -> Flow {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(
                target: "room.actor.peer",
                error = %e,
                len = text.len(),
                "Dropping unparseable frame"
            );
            return Flow::Continue;
        }
    };

    let Ok(message_type) = frame.message_type.parse::<MessageType>() else {
        trace!(target: "room.actor.peer", "Ignoring unknown message type");
        return Flow::Continue;
    };

    match message_type {
        MessageType::Message => {
            if !limiter.check(Instant::now()) {
                return rate_limited(ctx).await;
            }

            let Some(message) = frame.data.as_str() else {
                debug!(target: "room.actor.peer", "Dropping chat message with non-string data");
                return Flow::Continue;
            };

            let payload = make_payload(
                MessageType::Message,
                &ChatData {
                    peer_id: ctx.id.clone(),
                    peer_handle: ctx.handle.clone(),
                    message: message.to_string(),
                },
            );
            ctx.room.broadcast(MessageType::Message, payload).await;
        }

        MessageType::Typing => {
            let payload = make_payload(
                MessageType::Typing,
                &PeerData {
                    id: ctx.id.clone(),
                    handle: ctx.handle.clone(),
                },
            );
            ctx.room.broadcast(MessageType::Typing, payload).await;
        }

        MessageType::PeerList => ctx.room.request_list(ctx.conn_id).await,

        MessageType::RoomDispose => {
            info!(target: "room.actor.peer", "Peer requested room disposal");
            ctx.room.request_dispose(DisposeReason::PeerRequested);
        }

        _ => {}
    }

    Flow::Continue
}

async fn rate_limited(ctx: &PeerContext) -> Flow {
    warn!(target: "room.actor.peer", "Peer exceeded rate limit, evicting");
    metrics::record_peer_rate_limited();

    if let Err(e) = ctx.store.remove_session(&ctx.id, ctx.room.id()).await {
        warn!(
            target: "room.actor.peer",
            error = %e,
            "Failed to remove session of rate-limited peer"
        );
    }

    Flow::Leave(LeaveReason::RateLimited)
}

/// Write duty.
///
/// A reason on `close` is written as the final close frame, skipping any
/// backlog. If `close` is dropped unsent the mailbox alone drives the duty.
pub(crate) async fn run_writer(
    mut writer: BoxedWriter,
    mut mailbox: mpsc::Receiver<Outbound>,
    mut close: oneshot::Receiver<String>,
    ws_timeout: Duration,
    conn_id: Uuid,
) {
    let mut close_pending = true;

    loop {
        let (frame, last) = tokio::select! {
            biased;

            signal = &mut close, if close_pending => match signal {
                Ok(reason) => (Frame::Close(Some(reason)), true),
                Err(_) => {
                    close_pending = false;
                    continue;
                }
            },

            outbound = mailbox.recv() => match outbound {
                Some(Outbound::Payload(payload)) => (Frame::Text(payload.to_string()), false),
                Some(Outbound::Close(reason)) => (Frame::Close(Some(reason)), true),
                None => (Frame::Close(None), true),
            },
        };

        match tokio::time::timeout(ws_timeout, writer.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(target: "room.actor.peer", conn_id = %conn_id, error = %e, "Write failed");
                return;
            }
            Err(_) => {
                debug!(target: "room.actor.peer", conn_id = %conn_id, "Write timed out");
                return;
            }
        }

        if last {
            return;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::testing::mock_connection;
    use std::sync::Arc;

    #[test]
    fn test_rate_limiter_rejects_fourth_message_within_window() {
        let mut limiter = RateLimiter::new(Duration::from_secs(10), 3);
        let t0 = Instant::now();

        assert!(limiter.check(t0));
        assert!(limiter.check(t0 + Duration::from_millis(100)));
        assert!(limiter.check(t0 + Duration::from_millis(200)));
        assert!(!limiter.check(t0 + Duration::from_millis(300)));
        // Rejected messages do not count.
        assert_eq!(limiter.num_messages(), 3);
    }

    #[test]
    fn test_rate_limiter_allows_slow_boundary_message() {
        let mut limiter = RateLimiter::new(Duration::from_secs(1), 3);
        let t0 = Instant::now();

        assert!(limiter.check(t0));
        assert!(limiter.check(t0));
        assert!(limiter.check(t0));
        // The boundary message arrives after the interval.
        assert!(limiter.check(t0 + Duration::from_secs(2)));
        assert!(limiter.check(t0 + Duration::from_secs(2)));
        assert!(limiter.check(t0 + Duration::from_secs(2)));
        assert!(!limiter.check(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_rate_limiter_limit_of_one() {
        let mut limiter = RateLimiter::new(Duration::from_secs(1), 1);
        let t0 = Instant::now();

        assert!(limiter.check(t0));
        assert!(!limiter.check(t0 + Duration::from_millis(500)));
        assert!(limiter.check(t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn test_rate_limiter_zero_limit_treated_as_one() {
        let mut limiter = RateLimiter::new(Duration::from_secs(1), 0);
        let t0 = Instant::now();

        assert!(limiter.check(t0));
        assert!(!limiter.check(t0));
    }

    fn spawn_writer(
        writer: BoxedWriter,
    ) -> (
        mpsc::Sender<Outbound>,
        oneshot::Sender<String>,
        tokio::task::JoinHandle<()>,
    ) {
        let (tx, rx) = mpsc::channel(4);
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(run_writer(
            writer,
            rx,
            close_rx,
            Duration::from_secs(1),
            Uuid::new_v4(),
        ));
        (tx, close_tx, task)
    }

    #[tokio::test]
    async fn test_writer_writes_payloads_in_order_then_plain_close() {
        let (_reader, writer, mut client) = mock_connection();
        let (tx, close_tx, task) = spawn_writer(writer);
        drop(close_tx);

        tx.send(Outbound::Payload(Arc::from("one"))).await.unwrap();
        tx.send(Outbound::Payload(Arc::from("two"))).await.unwrap();
        drop(tx);

        assert_eq!(client.recv().await, Some(Frame::Text("one".to_string())));
        assert_eq!(client.recv().await, Some(Frame::Text("two".to_string())));
        assert_eq!(client.recv().await, Some(Frame::Close(None)));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_close_directive_writes_reason_and_stops() {
        let (_reader, writer, mut client) = mock_connection();
        let (tx, _close_tx, task) = spawn_writer(writer);

        tx.send(Outbound::Close("peer.ratelimited".to_string()))
            .await
            .unwrap();
        task.await.unwrap();

        assert_eq!(
            client.recv().await,
            Some(Frame::Close(Some("peer.ratelimited".to_string())))
        );
        // The mailbox receiver is gone once the duty returned.
        assert!(tx.send(Outbound::Payload(Arc::from("late"))).await.is_err());
    }

    #[tokio::test]
    async fn test_writer_stops_when_client_is_gone() {
        let (_reader, writer, client) = mock_connection();
        drop(client);
        let (tx, _close_tx, task) = spawn_writer(writer);

        tx.send(Outbound::Payload(Arc::from("lost"))).await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_close_signal_skips_backlog() {
        let (_reader, writer, mut client) = mock_connection();
        let (tx, close_tx, task) = spawn_writer(writer);

        // Queue a backlog, then signal before the duty gets to run.
        tx.send(Outbound::Payload(Arc::from("one"))).await.unwrap();
        tx.send(Outbound::Payload(Arc::from("two"))).await.unwrap();
        close_tx.send("room disposed".to_string()).unwrap();
        task.await.unwrap();

        assert_eq!(
            client.recv().await,
            Some(Frame::Close(Some("room disposed".to_string())))
        );
        assert_eq!(client.recv().await, None);
    }
}
