use std::time::Duration;

use crate::errors::BridgeError;

/// Environment variable holding the engine base URL.
pub const ENGINE_URL_ENV: &str = "GOAL_ENGINE_URL";
/// Environment variable holding the optional engine bearer token.
pub const ENGINE_API_KEY_ENV: &str = "GOAL_ENGINE_API_KEY";

/// Configuration for the task engine endpoint.
///
/// A missing base URL is not rejected here; it fails the first call that needs
/// it, before any request is sent.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base URL of the engine, for example `http://localhost:3000`.
    pub base_url: Option<String>,
    /// Optional bearer token sent with every request.
    pub api_key: Option<String>,
    /// Timeout for establishing a connection.
    ///
    /// Event streams are long-lived, so there is no whole-request timeout.
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Creates a config pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().base_url(base_url)
    }

    /// Builds a config from `GOAL_ENGINE_URL` and `GOAL_ENGINE_API_KEY`.
    ///
    /// Unset or blank variables leave the field empty.
    pub fn from_env() -> Self {
        Self {
            base_url: non_blank_env(ENGINE_URL_ENV),
            api_key: non_blank_env(ENGINE_API_KEY_ENV),
            ..Self::default()
        }
    }

    /// Overrides the engine base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the bearer token.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn goals_url(&self) -> Result<reqwest::Url, BridgeError> {
        self.endpoint(&["api", "goals"])
    }

    pub(crate) fn events_url(&self, goal_id: &str) -> Result<reqwest::Url, BridgeError> {
        self.endpoint(&["api", "goals", goal_id, "events"])
    }

    pub(crate) fn bearer(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Appends path segments to the base URL; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, BridgeError> {
        let base = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                BridgeError::configuration(format!(
                    "missing engine base URL (set {ENGINE_URL_ENV})"
                ))
            })?;
        let mut url = reqwest::Url::parse(base).map_err(|e| {
            BridgeError::configuration(format!("invalid engine base URL {base:?}: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                BridgeError::configuration(format!("engine base URL {base:?} cannot take a path"))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
