//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while interpreting a feed payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The server returned a well-formed envelope with `success: false`.
    #[error("server rejected request: {message}")]
    ServerRejected {
        /// Message supplied by the server, or a generic fallback.
        message: String,
    },

    /// The envelope reported success but carried no results body.
    #[error("envelope is missing the results body")]
    MissingResults,
}

impl ProtocolError {
    /// Creates a `ServerRejected` error from an optional server message.
    pub fn rejected(message: Option<String>) -> Self {
        Self::ServerRejected {
            message: message.unwrap_or_else(|| "request failed".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_uses_server_message() {
        let err = ProtocolError::rejected(Some("maintenance window".into()));
        assert_eq!(err.to_string(), "server rejected request: maintenance window");
    }

    #[test]
    fn rejected_falls_back_to_generic_message() {
        let err = ProtocolError::rejected(None);
        assert_eq!(err.to_string(), "server rejected request: request failed");
    }
}
