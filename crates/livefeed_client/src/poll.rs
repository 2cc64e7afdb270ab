//! The pull-poll client: fixed-interval requests with no overlap.

use crate::error::{FeedError, FeedResult};
use crate::transport::PollFetch;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Polls the results endpoint on a fixed schedule.
///
/// The first request is issued immediately; afterwards requests land on
/// interval boundaries counted from that first request. At most one request
/// is in flight at a time: boundaries that pass while a request is still
/// running are skipped, and the next request waits for the following
/// boundary rather than firing back-to-back. Dropping the client stops the
/// schedule and discards any in-flight result.
pub struct PollClient {
    fetcher: Arc<dyn PollFetch>,
    url: String,
    headers: Vec<(String, String)>,
    period: Duration,
    next_deadline: Option<Instant>,
    request_timeout: Duration,
}

impl PollClient {
    /// Creates a poll client; the first tick fires immediately.
    pub fn new(
        fetcher: Arc<dyn PollFetch>,
        url: String,
        headers: Vec<(String, String)>,
        poll_interval: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            url,
            headers,
            period: poll_interval,
            next_deadline: None,
            request_timeout,
        }
    }

    /// Waits for the next scheduled boundary and performs one request.
    ///
    /// A failed or timed-out request reports an error for that tick only;
    /// the schedule keeps running regardless of individual outcomes.
    pub async fn tick(&mut self) -> FeedResult<Vec<u8>> {
        let due = match self.next_deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                deadline
            }
            None => Instant::now(),
        };
        let result = tokio::time::timeout(
            self.request_timeout,
            self.fetcher.fetch(&self.url, &self.headers),
        )
        .await;

        // Realign after the request: any boundary that has already passed
        // is skipped, never queued.
        let now = Instant::now();
        let mut next = due + self.period;
        while next <= now {
            next += self.period;
        }
        self.next_deadline = Some(next);

        match result {
            Err(_) => Err(FeedError::RequestTimeout),
            Ok(result) => result,
        }
    }
}
