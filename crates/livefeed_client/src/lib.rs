//! # LiveFeed Client
//!
//! Connection supervision for the LiveFeed real-time results feed.
//!
//! This crate provides:
//! - `ConnectionSupervisor`: transport selection, reconnect, fallback, teardown
//! - `StreamChannel`: push-stream framing with heartbeat supervision
//! - `PollClient`: fixed-interval polling with no overlapping requests
//! - Bounded exponential backoff as a pure, testable schedule
//! - Transport traits with scripted mock implementations for tests
//!
//! ## Architecture
//!
//! The supervisor tries the **stream transport first** and reconnects with
//! exponential backoff; after exhausting the attempt budget it falls back to
//! polling for the remainder of the session. Only an explicit `refresh()`
//! returns to the stream. Both transports deliver the same JSON envelope,
//! normalized by `livefeed_protocol` before reaching subscribers.
//!
//! ## Key Invariants
//!
//! - Exactly one transport is active at any instant
//! - Parse and application errors never change connection state or consume
//!   the reconnect budget
//! - After `dispose()` returns, no subscriber callback runs
//! - Permanent poll fallback is a degradation, not a failure; it keeps
//!   working indefinitely

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod config;
mod error;
mod poll;
mod sse;
mod state;
mod stream;
mod supervisor;
mod transport;

pub use backoff::{delay_for_attempt, RetryState};
pub use config::{FeedConfig, RetryConfig, RESULTS_PATH};
pub use error::{FeedError, FeedResult};
pub use poll::PollClient;
pub use sse::{SseDecoder, SseEvent};
pub use state::{ConnectionState, FeedStats};
pub use stream::StreamChannel;
pub use supervisor::{
    ConnectionSupervisor, ErrorCallback, SnapshotCallback, StatusCallback, Subscription,
};
pub use transport::{
    FrameStream, MockPollFetch, MockStreamConnector, PollFetch, StreamConnector, StreamScript,
};
