//! Campfire streaming API.
//!
//! The streaming endpoint keeps an HTTP response open and writes one JSON
//! object per message, each terminated by `\r`. A single space is written
//! periodically as a keepalive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use ember_core::{TransportError, TransportResult};

use crate::model::StreamMessage;

/// Events produced by a room stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A message arrived in `room`.
    Message {
        /// Room name.
        room: String,
        /// The decoded message.
        message: StreamMessage,
    },
    /// The stream for `room` failed and has stopped.
    Error {
        /// Room name.
        room: String,
        /// Why the stream stopped.
        error: TransportError,
    },
}

impl StreamEvent {
    /// Returns the name of the room this event belongs to.
    pub fn room(&self) -> &str {
        match self {
            Self::Message { room, .. } | Self::Error { room, .. } => room,
        }
    }
}

/// Largest unterminated frame the decoder buffers before giving up.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Splits the streaming body into JSON frames.
///
/// Frames may arrive split across chunks or several to a chunk. Keepalive
/// whitespace produces no frame and is not buffered.
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a terminator.
    scanned: usize,
    max_frame_len: usize,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::with_max_frame_len(MAX_FRAME_LEN)
    }
}

impl StreamDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty decoder with a custom frame size limit.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_frame_len,
        }
    }

    /// Feeds a chunk and returns every frame it completes.
    ///
    /// Fails with [`TransportError::Decode`] once the unterminated tail
    /// grows past the frame size limit; the buffer is dropped in that case.
    pub fn push(&mut self, chunk: &[u8]) -> TransportResult<Vec<Vec<u8>>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..]
            .iter()
            .position(|b| matches!(b, b'\r' | b'\n'))
        {
            let end = from + offset;
            let trimmed = self.buffer[start..end].trim_ascii();
            if !trimmed.is_empty() {
                frames.push(trimmed.to_vec());
            }
            start = end + 1;
            from = start;
        }

        start += self.buffer[start..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_frame_len {
            let buffered = self.buffer.len();
            self.buffer = Vec::new();
            self.scanned = 0;
            return Err(TransportError::decode(format!(
                "stream frame exceeds {} bytes ({buffered} buffered without a terminator)",
                self.max_frame_len
            )));
        }
        Ok(frames)
    }

    /// Returns the trailing frame left when the body ends without a
    /// terminator.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        let trimmed = rest.trim_ascii();
        (!trimmed.is_empty()).then(|| trimmed.to_vec())
    }

    /// Returns the number of buffered bytes not yet framed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Handle to a running room stream.
///
/// Dropping the handle stops the stream.
#[derive(Debug)]
pub struct StreamHandle {
    room: String,
    live: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl StreamHandle {
    pub(crate) fn new(room: String, live: Arc<AtomicBool>, cancel: CancellationToken) -> Self {
        Self { room, live, cancel }
    }

    /// Returns the room name.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Returns true while the stream is delivering messages.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Stops the stream. No events are produced afterwards.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.live.store(false, Ordering::SeqCst);
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reads an open streaming response until it ends or is cancelled.
pub(crate) async fn run_stream(
    response: reqwest::Response,
    room: String,
    events: mpsc::Sender<StreamEvent>,
    live: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => None,
        error = read_frames(response, &room, &events) => Some(error),
    };
    live.store(false, Ordering::SeqCst);

    match outcome {
        None => debug!(room = %room, "Stream stopped"),
        Some(error) => {
            if cancel.is_cancelled() {
                return;
            }
            warn!(room = %room, error = %error, "Stream ended");
            let _ = events.send(StreamEvent::Error { room, error }).await;
        }
    }
}

/// Forwards decoded frames until the body ends; returns why it ended.
async fn read_frames(
    response: reqwest::Response,
    room: &str,
    events: &mpsc::Sender<StreamEvent>,
) -> TransportError {
    info!(room = %room, "Stream started");

    let mut body = response.bytes_stream();
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                return TransportError::StreamClosed {
                    reason: e.to_string(),
                };
            }
        };
        trace!(room = %room, len = chunk.len(), "Received stream chunk");

        let frames = match decoder.push(&chunk) {
            Ok(frames) => frames,
            Err(e) => return e,
        };
        for frame in frames {
            if !forward_frame(&frame, room, events).await {
                return receiver_gone();
            }
        }
    }

    if let Some(frame) = decoder.finish()
        && !forward_frame(&frame, room, events).await
    {
        return receiver_gone();
    }

    TransportError::StreamClosed {
        reason: "server closed the stream".to_string(),
    }
}

/// Decodes and forwards one frame. Returns false once the receiver is gone.
async fn forward_frame(frame: &[u8], room: &str, events: &mpsc::Sender<StreamEvent>) -> bool {
    match serde_json::from_slice::<StreamMessage>(frame) {
        Ok(message) => events
            .send(StreamEvent::Message {
                room: room.to_string(),
                message,
            })
            .await
            .is_ok(),
        Err(e) => {
            warn!(room = %room, error = %e, "Skipping undecodable stream frame");
            true
        }
    }
}

fn receiver_gone() -> TransportError {
    TransportError::StreamClosed {
        reason: "event receiver dropped".to_string(),
    }
}
