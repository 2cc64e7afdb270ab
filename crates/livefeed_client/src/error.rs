//! Error types for the feed client.

use thiserror::Error;

/// Result type for feed client operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors surfaced by the feed client.
///
/// Only transport-level errors drive the reconnect state machine; parse and
/// application errors are reported to subscribers and otherwise ignored.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    /// Connection refused, dropped, or otherwise failed at the network level.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// No frame (data or keepalive) arrived within the heartbeat window.
    #[error("stream heartbeat timed out")]
    HeartbeatTimeout,

    /// A single poll request exceeded its timeout.
    #[error("poll request timed out")]
    RequestTimeout,

    /// The payload body could not be decoded.
    #[error("malformed payload: {0}")]
    Parse(String),

    /// The server returned a well-formed payload with `success: false`.
    #[error("application error: {0}")]
    Application(String),
}

impl FeedError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a failed or dead connection.
    ///
    /// Transport errors feed the reconnect/backoff budget while streaming;
    /// parse and application errors never do.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FeedError::Transport { .. } | FeedError::HeartbeatTimeout | FeedError::RequestTimeout
        )
    }
}
