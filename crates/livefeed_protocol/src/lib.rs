//! # LiveFeed Protocol
//!
//! Wire envelope, snapshot model, and period matching for LiveFeed.
//!
//! This crate provides:
//! - `ResultsEnvelope` for the backend's JSON response shape
//! - `PeriodKey` and `DateQuery` for separator-tolerant date matching
//! - `Snapshot` and `normalize` for deduplicated client-side state
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Key Invariants
//!
//! - `normalize` never emits a history entry whose period equals `as_of`
//! - History order is preserved from the server (newest first), only filtered
//! - Date equality tolerates `-` and `/` separators and unpadded components

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod error;
mod period;
mod snapshot;

pub use envelope::{HistoricalPeriod, PeriodResult, ResultsBody, ResultsEnvelope};
pub use error::{ProtocolError, ProtocolResult};
pub use period::{DateQuery, PeriodKey};
pub use snapshot::{normalize, Snapshot};
