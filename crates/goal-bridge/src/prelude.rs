//! Common imports for typical bridge usage.
pub use crate::{
    BridgeError, ChunkSink, ChunkStream, EngineClient, EngineConfig, EngineEvent, GoalId,
    GoalRequest, JsonLinesSink, OutputChunk, StreamEnd,
};
