//! CDP error types.

use thiserror::Error;

/// Errors raised at the protocol session boundary.
///
/// Components above the session rarely propagate these: the map builder
/// recovers to empty maps, the box resolver to `None`, and so on.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to the browser endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol error returned by the browser.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Command timed out waiting for its response.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Connection closed while a request was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Send attempted on a detached session.
    #[error("Session detached")]
    Detached,

    /// Response arrived but did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}
