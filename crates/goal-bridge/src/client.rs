use std::fmt;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::errors::BridgeError;
use crate::event::{Payload, first_text, nested};
use crate::pipeline::{ChunkStream, StreamEnd, forward_events, translate_events};
use crate::sink::ChunkSink;
use crate::sse::{EventStream, decode_events};

const GOAL_ID_FIELDS: &[&str] = &["goalId", "goal_id", "id"];

/// Opaque goal identifier assigned by the engine.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GoalId(pub String);

impl GoalId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GoalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GoalId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Goal submission body.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GoalRequest {
    /// Natural-language description of the goal.
    pub goal: String,
    /// Model identifier, passed to the engine verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Free-form metadata forwarded to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Payload>,
}

impl GoalRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            model: None,
            metadata: None,
        }
    }

    /// Sets the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the metadata object.
    pub fn metadata(mut self, metadata: Payload) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// HTTP client for the task engine.
///
/// Each call fails fast with [`BridgeError::Configuration`] when the base URL
/// is missing. Nothing is retried.
#[derive(Clone, Debug)]
pub struct EngineClient {
    http: reqwest::Client,
    config: EngineConfig,
}

impl EngineClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: EngineConfig) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BridgeError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Creates a client configured from `GOAL_ENGINE_URL` / `GOAL_ENGINE_API_KEY`.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Submits a goal and returns the id the engine assigned to it.
    pub async fn start_goal(&self, request: &GoalRequest) -> Result<GoalId, BridgeError> {
        let url = self.config.goals_url()?;
        debug!(%url, model = ?request.model, "submitting goal");
        let response = self
            .authorized(self.http.post(url))
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("goal submission failed: {e}")))?;
        let response = ensure_success(response, "goal submission").await?;
        let body: serde_json::Value = response.json().await.map_err(|e| {
            BridgeError::protocol(format!("goal submission returned invalid JSON: {e}"))
        })?;
        let goal_id = extract_goal_id(&body).ok_or_else(|| {
            BridgeError::protocol("goal submission response did not include a goal id")
        })?;
        info!(goal_id = %goal_id, "goal submitted");
        Ok(goal_id)
    }

    /// Opens the goal's SSE stream and returns its decoded events.
    ///
    /// Dropping the returned stream closes the connection.
    pub async fn open_events(&self, goal_id: &GoalId) -> Result<EventStream, BridgeError> {
        let url = self.config.events_url(goal_id.as_str())?;
        debug!(goal_id = %goal_id, %url, "opening goal event stream");
        let response = self
            .authorized(self.http.get(url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("event stream request failed: {e}")))?;
        let response = ensure_success(response, "event stream").await?;
        Ok(decode_events(response.bytes_stream()))
    }

    /// Opens the goal's stream and translates it into chunks.
    pub async fn stream_goal(&self, goal_id: &GoalId) -> Result<ChunkStream, BridgeError> {
        Ok(translate_events(self.open_events(goal_id).await?))
    }

    /// Streams an existing goal into `sink` until it finishes or the engine
    /// closes the stream.
    pub async fn watch_goal<K>(
        &self,
        goal_id: &GoalId,
        sink: &mut K,
    ) -> Result<StreamEnd, BridgeError>
    where
        K: ChunkSink + ?Sized,
    {
        let events = self.open_events(goal_id).await?;
        let end = forward_events(events, sink).await?;
        info!(goal_id = %goal_id, ?end, "goal stream ended");
        Ok(end)
    }

    /// Submits a goal and streams it into `sink`.
    pub async fn run_goal<K>(
        &self,
        request: &GoalRequest,
        sink: &mut K,
    ) -> Result<(GoalId, StreamEnd), BridgeError>
    where
        K: ChunkSink + ?Sized,
    {
        let goal_id = self.start_goal(request).await?;
        let end = self.watch_goal(&goal_id, sink).await?;
        Ok((goal_id, end))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, BridgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(BridgeError::status(
        status.as_u16(),
        format!("{what} failed with status {status}: {body}"),
    ))
}

fn extract_goal_id(body: &serde_json::Value) -> Option<GoalId> {
    let object = body.as_object()?;
    first_text(object, GOAL_ID_FIELDS)
        .or_else(|| nested(object, "goal").and_then(|goal| first_text(goal, &["id"])))
        .map(|id| GoalId::new(id.into_owned()))
}
