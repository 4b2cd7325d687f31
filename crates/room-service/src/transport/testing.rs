//! In-memory transport for driving peers without sockets.
//!
//! [`mock_connection`] returns the server-side halves (to hand to
//! `RoomHandle::add_peer`) plus a [`ClientEnd`] that plays the remote browser.

use super::{BoxedReader, BoxedWriter, Frame, FrameReader, FrameWriter, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default wait used by [`ClientEnd::recv`].
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct ChannelReader {
    rx: mpsc::UnboundedReceiver<Frame>,
}

struct ChannelWriter {
    tx: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl FrameReader for ChannelReader {
    async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

#[async_trait]
impl FrameWriter for ChannelWriter {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// The remote side of a mock connection.
pub struct ClientEnd {
    to_server: Option<mpsc::UnboundedSender<Frame>>,
    from_server: mpsc::UnboundedReceiver<Frame>,
}

/// Create a connected pair of server halves and a client end.
pub fn mock_connection() -> (BoxedReader, BoxedWriter, ClientEnd) {
    let (to_server, server_rx) = mpsc::unbounded_channel();
    let (server_tx, from_server) = mpsc::unbounded_channel();

    (
        Box::new(ChannelReader { rx: server_rx }),
        Box::new(ChannelWriter { tx: server_tx }),
        ClientEnd {
            to_server: Some(to_server),
            from_server,
        },
    )
}

impl ClientEnd {
    /// Send a raw text frame to the server.
    pub fn send_text(&self, text: impl Into<String>) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(Frame::Text(text.into()));
        }
    }

    /// Send an inbound `{type, data}` frame.
    pub fn send_message(&self, message_type: &str, data: Value) {
        let frame = serde_json::json!({ "type": message_type, "data": data });
        self.send_text(frame.to_string());
    }

    /// Send a chat message.
    pub fn chat(&self, text: &str) {
        self.send_message("message", Value::String(text.to_string()));
    }

    /// Send a close frame, as a browser does when the tab is closed.
    pub fn close(&self) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(Frame::Close(None));
        }
    }

    /// End the inbound stream without a close frame.
    pub fn disconnect(&mut self) {
        self.to_server = None;
    }

    /// Wait up to `timeout` for the next frame written by the server.
    ///
    /// Returns `None` on timeout or once the server dropped its writer.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Frame> {
        tokio::time::timeout(timeout, self.from_server.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for the next frame with the default timeout.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.recv_timeout(DEFAULT_RECV_TIMEOUT).await
    }

    /// Wait for the next frame and decode it as a JSON envelope.
    ///
    /// Returns `None` if the next frame is not a text frame.
    pub async fn recv_envelope(&mut self) -> Option<Value> {
        match self.recv().await? {
            Frame::Text(text) => serde_json::from_str(&text).ok(),
            Frame::Close(_) => None,
        }
    }

    /// Receive envelopes until one of `message_type` arrives.
    ///
    /// Frames of other types are discarded. Returns `None` if a close frame or
    /// a timeout comes first.
    pub async fn recv_type(&mut self, message_type: &str) -> Option<Value> {
        loop {
            let envelope = self.recv_envelope().await?;
            if envelope.get("type").and_then(Value::as_str) == Some(message_type) {
                return Some(envelope);
            }
        }
    }

    /// Receive frames until a close frame arrives and return its reason.
    ///
    /// Returns `None` on timeout or if the writer was dropped without one.
    pub async fn recv_close(&mut self) -> Option<Option<String>> {
        loop {
            match self.recv().await? {
                Frame::Close(reason) => return Some(reason),
                Frame::Text(_) => {}
            }
        }
    }

    /// Return a frame if one is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.from_server.try_recv().ok()
    }
}
