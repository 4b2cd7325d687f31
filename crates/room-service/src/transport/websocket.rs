//! WebSocket adapter for the transport traits.
//!
//! An upgraded axum [`WebSocket`] is split into its stream and sink halves.
//! Binary frames are not part of the chat protocol and are skipped; pings and
//! pongs are answered by axum itself.

use super::{BoxedReader, BoxedWriter, Frame, FrameReader, FrameWriter, TransportError};
use async_trait::async_trait;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tracing::trace;

/// Read half of a WebSocket connection.
pub struct WsReader {
    stream: SplitStream<WebSocket>,
}

/// Write half of a WebSocket connection.
pub struct WsWriter {
    sink: SplitSink<WebSocket, Message>,
}

/// Split an upgraded socket into boxed transport halves.
pub fn split(socket: WebSocket) -> (BoxedReader, BoxedWriter) {
    let (sink, stream) = socket.split();
    (
        Box::new(WsReader { stream }),
        Box::new(WsWriter { sink }),
    )
}

#[async_trait]
impl FrameReader for WsReader {
    async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            let Some(msg) = self.stream.next().await else {
                return Ok(None);
            };

            match msg.map_err(|e| TransportError::Io(e.to_string()))? {
                Message::Text(text) => return Ok(Some(Frame::Text(text))),
                Message::Close(frame) => {
                    return Ok(Some(Frame::Close(frame.map(|f| f.reason.into_owned()))));
                }
                Message::Binary(data) => {
                    trace!(target: "room.transport", len = data.len(), "Ignoring binary frame");
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    }
}

#[async_trait]
impl FrameWriter for WsWriter {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let msg = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Close(reason) => Message::Close(reason.map(|reason| CloseFrame {
                code: close_code::NORMAL,
                reason: Cow::Owned(reason),
            })),
        };

        self.sink.send(msg).await.map_err(|e| TransportError::Io(e.to_string()))
    }
}
