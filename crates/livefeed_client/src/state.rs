//! Connection state and feed statistics.

use std::fmt;
use std::time::Instant;

/// The connection state of a feed supervisor.
///
/// Exactly one state is active at any instant; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created but not yet started.
    Idle,
    /// Opening the stream transport (including backoff waits between
    /// reconnect attempts).
    Connecting,
    /// Receiving frames over the stream transport.
    Streaming,
    /// Stream retries exhausted; polling on a fixed interval.
    Polling,
    /// Disposed. No further transitions occur.
    Closed,
}

impl ConnectionState {
    /// Returns true if a transport is active or being established.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Streaming | ConnectionState::Polling
        )
    }

    /// Returns true for the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Polling => "polling",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Statistics about a feed session.
#[derive(Debug, Clone, Default)]
pub struct FeedStats {
    /// Total snapshots delivered to subscribers.
    pub snapshots_delivered: u64,
    /// Total payloads that failed to decode.
    pub parse_errors: u64,
    /// Total well-formed payloads with `success: false`.
    pub application_errors: u64,
    /// Total transport-level failures (both transports).
    pub transport_errors: u64,
    /// Total stream reconnect attempts scheduled.
    pub reconnect_attempts: u64,
    /// Total poll requests issued.
    pub poll_ticks: u64,
    /// Last error message, if any.
    pub last_error: Option<String>,
    /// Time of the last delivered snapshot.
    pub last_snapshot_time: Option<Instant>,
}
