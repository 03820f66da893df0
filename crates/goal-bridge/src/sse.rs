//! SSE frame decoding for engine event streams.
//!
//! Frames are cut from a byte buffer, never from a lossy string, so a frame or
//! a multi-byte character split across network reads is reassembled before it
//! is parsed. The trailing partial frame always stays in the buffer.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, trace};

use crate::errors::BridgeError;
use crate::event::EngineEvent;

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

const HEARTBEAT_EVENT: &str = "heartbeat";
const CONNECTED_EVENT: &str = "connected";
const DONE_EVENT: &str = "done";

/// Lazy sequence of decoded engine events.
///
/// Ends with `None` after a `done` frame or a clean transport close, or with a
/// single `Err` when the transport fails mid-read.
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<EngineEvent, BridgeError>> + Send>>;

type ByteStream = Pin<Box<dyn futures::Stream<Item = Result<Bytes, BridgeError>> + Send>>;

/// Raw `event:` / `data:` fields of one frame, before JSON decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Parses the lines of one frame. Frames with neither field are skipped.
    fn parse(raw: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(raw);
        let mut event = None;
        let mut data: Option<String> = None;
        for line in text.split('\n').map(|line| line.trim_end_matches('\r')) {
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => match data.as_mut() {
                    Some(joined) => {
                        joined.push('\n');
                        joined.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                },
                // Empty field names are comments; unknown fields are ignored.
                _ => {}
            }
        }
        if event.is_none() && data.is_none() {
            return None;
        }
        Some(Self {
            event,
            data: data.unwrap_or_default(),
        })
    }
}

/// Incremental frame splitter over raw bytes.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    /// Offset in `buf` before which no terminator can start.
    scanned: usize,
}

impl SseDecoder {
    /// Appends a chunk and returns every frame it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut frame_start = 0;
        let mut from = self.scanned;
        while let Some((frame_end, next_start)) = find_terminator(&self.buf, from) {
            frames.extend(SseFrame::parse(&self.buf[frame_start..frame_end]));
            frame_start = next_start;
            from = next_start;
        }
        self.buf.drain(..frame_start);
        // The last three bytes may begin a terminator completed by the next chunk.
        self.scanned = self.buf.len().saturating_sub(3);
        frames
    }

    /// Bytes of the incomplete frame still waiting for its terminator.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}

/// Finds the first blank line at or after `from`, returning where the frame
/// ends and where the next one starts.
fn find_terminator(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\n\n") {
            Some((i, i + 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((i, i + 4))
        } else {
            None
        }
    })
}

#[derive(Debug, PartialEq)]
enum FrameKind {
    Event(EngineEvent),
    /// Keep-alive and handshake frames; never forwarded.
    Control,
    /// End-of-stream marker sent by the engine.
    Done,
    /// Data is not a JSON object. Dropped on purpose: one bad frame must not
    /// end a long-running goal stream.
    Malformed(String),
}

fn classify_frame(frame: SseFrame) -> FrameKind {
    let name = frame
        .event
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string());
    match name.as_str() {
        HEARTBEAT_EVENT | CONNECTED_EVENT => FrameKind::Control,
        DONE_EVENT => FrameKind::Done,
        _ => match serde_json::from_str::<serde_json::Value>(&frame.data) {
            Ok(value) => match EngineEvent::from_value(name, value) {
                Some(event) => FrameKind::Event(event),
                None => FrameKind::Malformed("payload is not a JSON object".into()),
            },
            Err(e) => FrameKind::Malformed(e.to_string()),
        },
    }
}

/// Decodes a raw SSE byte stream into engine events.
///
/// The byte stream is owned by the returned stream and dropped as soon as the
/// sequence ends (`done`, transport close, transport error) or when the
/// consumer drops it, which releases the underlying connection.
pub fn decode_events<S, E>(bytes: S) -> EventStream
where
    S: futures::Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + 'static,
{
    struct State {
        bytes: Option<ByteStream>,
        decoder: SseDecoder,
        pending: VecDeque<EngineEvent>,
    }

    let bytes: ByteStream = Box::pin(bytes.map(|chunk| {
        chunk.map_err(|e| BridgeError::transport(format!("event stream read failed: {e}")))
    }));

    Box::pin(stream::try_unfold(
        State {
            bytes: Some(bytes),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                let Some(bytes) = state.bytes.as_mut() else {
                    return Ok(None);
                };

                let next = bytes.next().await;
                match next {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            match classify_frame(frame) {
                                FrameKind::Event(event) => state.pending.push_back(event),
                                FrameKind::Control => trace!("skipping control frame"),
                                FrameKind::Malformed(reason) => {
                                    debug!(%reason, "dropping malformed SSE frame");
                                }
                                FrameKind::Done => {
                                    debug!(
                                        buffered = state.decoder.buffered_len(),
                                        "engine sent done; closing event stream"
                                    );
                                    state.bytes = None;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        let buffered = state.decoder.buffered_len();
                        if buffered > 0 {
                            debug!(buffered, "discarding incomplete trailing SSE frame");
                        }
                        state.bytes = None;
                    }
                }
            }
        },
    ))
}
