//! Connection transport abstraction.
//!
//! A peer's connection is split into a [`FrameReader`] and a [`FrameWriter`]
//! so the read and write duties can run as independent tasks. The room and
//! peer actors only see these traits; the WebSocket adapter lives in
//! [`websocket`] and an in-memory implementation for tests in `testing`.

use async_trait::async_trait;
use thiserror::Error;

pub mod websocket;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

/// A single transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text payload (JSON envelopes in both directions).
    Text(String),
    /// Connection close, with an optional reason.
    Close(Option<String>),
}

/// Transport-level failures. Any of these ends the duty that observed it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("write timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Io(String),
}

/// Inbound half of a peer connection.
#[async_trait]
pub trait FrameReader: Send + 'static {
    /// Wait for the next frame.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError>;
}

/// Outbound half of a peer connection.
#[async_trait]
pub trait FrameWriter: Send + 'static {
    /// Write one frame to the connection.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;
}

/// Boxed reader as handed to the room on join.
pub type BoxedReader = Box<dyn FrameReader>;

/// Boxed writer as handed to the room on join.
pub type BoxedWriter = Box<dyn FrameWriter>;
