//! Drivers that run decoded events through an [`EventTranslator`].
//!
//! Both drivers close an open text span on every way out: graceful `done`,
//! transport failure, or (for [`forward_events`]) the future being dropped.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::chunk::OutputChunk;
use crate::errors::BridgeError;
use crate::event::EngineEvent;
use crate::sink::ChunkSink;
use crate::sse::EventStream;
use crate::translator::EventTranslator;

/// Lazy sequence of translated chunks.
///
/// A transport failure is yielded as the last item, after the `text-end` that
/// closes any open span.
pub type ChunkStream =
    Pin<Box<dyn futures::Stream<Item = Result<OutputChunk, BridgeError>> + Send>>;

/// How a sink-driven goal stream ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// `goal:completed` was translated and a `finish` chunk was written.
    Finished,
    /// The engine closed the stream (`done` or end of body) before finishing.
    Closed,
}

/// Translates an event stream into a chunk stream.
///
/// Pulls one event at a time. After a `finish` chunk the event source is
/// dropped, releasing its transport, and the stream ends.
pub fn translate_events<S>(events: S) -> ChunkStream
where
    S: futures::Stream<Item = Result<EngineEvent, BridgeError>> + Send + 'static,
{
    struct State {
        events: Option<EventStream>,
        translator: EventTranslator,
        pending: VecDeque<Result<OutputChunk, BridgeError>>,
    }

    Box::pin(stream::unfold(
        State {
            events: Some(Box::pin(events)),
            translator: EventTranslator::new(),
            pending: VecDeque::new(),
        },
        |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                let events = state.events.as_mut()?;

                let next = events.next().await;
                match next {
                    Some(Ok(event)) => {
                        let chunks = state.translator.translate(&event);
                        let finished = chunks.iter().any(OutputChunk::is_finish);
                        state.pending.extend(chunks.into_iter().map(Ok));
                        if finished {
                            debug!("goal finished; releasing event stream");
                            state.events = None;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "goal event stream failed");
                        state.events = None;
                        state.pending.extend(state.translator.finish().map(Ok));
                        state.pending.push_back(Err(err));
                    }
                    None => {
                        state.events = None;
                        state.pending.extend(state.translator.finish().map(Ok));
                    }
                }
            }
        },
    ))
}

/// Writes translated chunks to `sink` as events arrive.
///
/// The open text span is closed on every exit: normal end, error return, or
/// the returned future being dropped before completion (for example by a
/// caller-side deadline).
pub async fn forward_events<S, K>(events: S, sink: &mut K) -> Result<StreamEnd, BridgeError>
where
    S: futures::Stream<Item = Result<EngineEvent, BridgeError>>,
    K: ChunkSink + ?Sized,
{
    let mut session = SinkSession {
        sink,
        translator: EventTranslator::new(),
    };
    let mut events = std::pin::pin!(events);
    while let Some(next) = events.next().await {
        let event = next.inspect_err(|err| warn!(error = %err, "goal event stream failed"))?;
        if session.push(&event) {
            return Ok(StreamEnd::Finished);
        }
    }
    Ok(StreamEnd::Closed)
}

struct SinkSession<'a, K: ChunkSink + ?Sized> {
    sink: &'a mut K,
    translator: EventTranslator,
}

impl<K: ChunkSink + ?Sized> SinkSession<'_, K> {
    /// Writes the event's chunks and reports whether a `finish` was among them.
    fn push(&mut self, event: &EngineEvent) -> bool {
        let mut finished = false;
        for chunk in self.translator.translate(event) {
            finished |= chunk.is_finish();
            self.sink.write(chunk);
        }
        finished
    }
}

impl<K: ChunkSink + ?Sized> Drop for SinkSession<'_, K> {
    fn drop(&mut self) {
        if let Some(chunk) = self.translator.finish() {
            self.sink.write(chunk);
        }
    }
}
