use std::io::Write;

use tokio::sync::mpsc;
use tracing::warn;

use crate::chunk::OutputChunk;

/// Destination for translated chunks, typically a UI renderer.
///
/// Chunks arrive one at a time in emission order. Writes are fire-and-forget:
/// the bridge expects the sink to buffer and never waits on it.
pub trait ChunkSink {
    fn write(&mut self, chunk: OutputChunk);
}

impl ChunkSink for Vec<OutputChunk> {
    fn write(&mut self, chunk: OutputChunk) {
        self.push(chunk);
    }
}

impl ChunkSink for mpsc::UnboundedSender<OutputChunk> {
    fn write(&mut self, chunk: OutputChunk) {
        if self.send(chunk).is_err() {
            warn!("chunk receiver dropped; discarding chunk");
        }
    }
}

impl<S: ChunkSink + ?Sized> ChunkSink for &mut S {
    fn write(&mut self, chunk: OutputChunk) {
        (**self).write(chunk);
    }
}

/// Writes each chunk as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChunkSink for JsonLinesSink<W> {
    fn write(&mut self, chunk: OutputChunk) {
        let result = serde_json::to_writer(&mut self.writer, &chunk)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            warn!(error = %e, "failed to write chunk");
        }
    }
}
