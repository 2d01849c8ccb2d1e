//! Error types for the HTN status bot

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching a metric from an external API
///
/// None of these escape a [`MetricSource`](crate::source::MetricSource):
/// they are logged and turned into [`MetricValue::Unavailable`](crate::types::MetricValue).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network request failed (transport error or timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Body was not the JSON we expected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Expected field absent from an otherwise valid response
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The base URL for this source was never configured
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl FetchError {
    /// Creates an InvalidResponse error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// Errors raised while reading configuration at startup
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The bot credential is absent or blank
    #[error("TOKEN is required")]
    MissingToken,

    /// An integer variable is set but not an integer
    #[error("{name} must be an integer (got {value:?})")]
    InvalidInteger { name: &'static str, value: String },
}

/// Errors returned by the chat platform when applying an update
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Request never reached the platform
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Platform asked us to slow down
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Duration },

    /// Bot lacks the permission for this action
    #[error("Missing permission")]
    Forbidden,

    /// Target resource does not exist (or was deleted)
    #[error("Resource not found")]
    NotFound,

    /// Any other rejected request
    #[error("Platform API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The gateway session that carries this update is gone
    #[error("Gateway session closed")]
    Closed,
}

/// Errors that end a gateway session
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Websocket transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// Payload did not decode
    #[error("Invalid gateway payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Socket closed by the remote end
    #[error("Gateway closed: {0}")]
    Closed(String),

    /// Heartbeat was not acknowledged before the next one was due
    #[error("Heartbeat not acknowledged")]
    Zombie,

    /// Gateway requested a reconnect (op 7)
    #[error("Gateway requested reconnect")]
    ReconnectRequested,

    /// Gateway rejected the session (op 9)
    #[error("Invalid session")]
    InvalidSession,

    /// Protocol sequence was not what we expected
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}
