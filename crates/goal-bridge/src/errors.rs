/// Errors surfaced by the bridge.
///
/// Malformed SSE frames and engine-reported failures are deliberately absent:
/// the decoder drops the former and the translator turns the latter into an
/// `error` chunk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Required endpoint configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The engine could not be reached, answered with a non-success status,
    /// or the event stream broke mid-read.
    #[error("connection error: {message}")]
    Connection {
        status: Option<u16>,
        message: String,
    },
    /// The engine answered with a response the bridge cannot use.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl BridgeError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a connection error without an HTTP status (transport failure).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Connection {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a connection error for a non-success HTTP status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Connection {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns the HTTP status carried by a connection error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Connection { status, .. } => *status,
            Self::Configuration(_) | Self::Protocol(_) => None,
        }
    }

    /// Returns true when the error came from the transport rather than from
    /// local configuration or response shape.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
