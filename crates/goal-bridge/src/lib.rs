//! Bridge from a multi-agent task engine's goal event stream to chat UI chunks.
//!
//! The engine reports goal progress as server-sent events. This crate decodes
//! that stream ([`sse`]), translates each event into UI chunks
//! ([`translator`]), and drives the two together ([`pipeline`]), making sure
//! an open text span is always closed however the stream ends.
//!
//! # Usage
//!
//! ```no_run
//! use goal_bridge::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), BridgeError> {
//! let client = EngineClient::new(EngineConfig::new("http://localhost:3000"))?;
//! let mut sink = JsonLinesSink::new(std::io::stdout());
//!
//! let (goal_id, end) = client
//!     .run_goal(&GoalRequest::new("Summarize open issues"), &mut sink)
//!     .await?;
//! eprintln!("goal {goal_id} ended: {end:?}");
//! # Ok(())
//! # }
//! ```

/// Output chunk types handed to the UI.
pub mod chunk;
/// Engine HTTP client: goal submission and event streams.
pub mod client;
/// Engine endpoint configuration.
pub mod config;
/// Public error type.
pub mod errors;
/// Decoded engine events and payload field helpers.
pub mod event;
/// Logging setup.
pub mod observability;
/// Event-to-chunk drivers with the span-closing guarantee.
pub mod pipeline;
/// Common imports for typical usage.
pub mod prelude;
/// UI sink abstraction and built-in sinks.
pub mod sink;
/// SSE frame decoder.
pub mod sse;
/// Event-to-chunk translation state machine.
pub mod translator;

pub use chunk::OutputChunk;
pub use client::{EngineClient, GoalId, GoalRequest};
pub use config::EngineConfig;
pub use errors::BridgeError;
pub use event::{EngineEvent, Payload};
pub use pipeline::{ChunkStream, StreamEnd, forward_events, translate_events};
pub use sink::{ChunkSink, JsonLinesSink};
pub use sse::{EventStream, decode_events};
pub use translator::{EventTranslator, TextSpan};
