//! Error types for the CDP driver layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CdpError>;

#[derive(Debug, Error)]
pub enum CdpError {
    /// Browser executable could not be found or spawned.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// DevTools HTTP endpoint (`/json/*`) unreachable or malformed.
    #[error("devtools endpoint error: {0}")]
    Http(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The browser answered with a protocol-level error object.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection closed before a pending call was answered.
    #[error("connection closed before response arrived")]
    ChannelClosed,

    #[error("timed out after {ms}ms waiting for {what}")]
    Timeout { ms: u64, what: String },

    /// `Runtime.evaluate` raised a JavaScript exception.
    #[error("evaluation failed: {0}")]
    Evaluate(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
