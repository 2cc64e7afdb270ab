//! Transport abstractions for the feed client.
//!
//! Both transports hide behind small traits so the supervisor can be driven
//! by real HTTP implementations (reqwest, hyper, ureq, platform clients) or
//! by the scripted mocks shipped here for tests.

use crate::error::{FeedError, FeedResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Opens push-style stream connections.
///
/// A real implementation issues `GET {url}` with `Accept: text/event-stream`
/// and keeps the response body open, yielding chunks as the server flushes
/// them.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Opens a stream connection, resolving once the response is established.
    async fn connect(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> FeedResult<Box<dyn FrameStream>>;
}

/// A live stream connection yielding raw byte chunks.
///
/// Dropping the stream closes the underlying connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Returns the next chunk, `Ok(None)` on orderly close, or an error when
    /// the connection drops.
    async fn next_chunk(&mut self) -> FeedResult<Option<Vec<u8>>>;
}

/// Performs single poll requests.
#[async_trait]
pub trait PollFetch: Send + Sync {
    /// Issues one `GET {url}` and returns the response body.
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> FeedResult<Vec<u8>>;
}

// ── Scripted mocks ──────────────────────────────────────────────────

/// What a [`MockStreamConnector`] does on the next connect call.
enum ConnectOutcome {
    Refused,
    Stream(ScriptedStream),
}

/// A mock stream connector driven by a script of connect outcomes.
///
/// When the script is empty, connects are refused. Connect times are
/// recorded against the (possibly paused) tokio clock so backoff schedules
/// can be asserted exactly.
#[derive(Default)]
pub struct MockStreamConnector {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    connect_times: Mutex<Vec<tokio::time::Instant>>,
}

impl MockStreamConnector {
    /// Creates a connector that refuses every connect.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scripts one refused connect attempt.
    pub fn push_refused(&self) {
        self.outcomes.lock().push_back(ConnectOutcome::Refused);
    }

    /// Scripts one successful connect and returns the handle that feeds it.
    pub fn push_stream(&self) -> StreamScript {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outcomes
            .lock()
            .push_back(ConnectOutcome::Stream(ScriptedStream { rx }));
        StreamScript { tx }
    }

    /// Returns the number of connect calls made so far.
    pub fn connect_count(&self) -> usize {
        self.connect_times.lock().len()
    }

    /// Returns the recorded connect times.
    pub fn connect_times(&self) -> Vec<tokio::time::Instant> {
        self.connect_times.lock().clone()
    }
}

#[async_trait]
impl StreamConnector for MockStreamConnector {
    async fn connect(
        &self,
        _url: &str,
        _headers: &[(String, String)],
    ) -> FeedResult<Box<dyn FrameStream>> {
        self.connect_times.lock().push(tokio::time::Instant::now());
        match self.outcomes.lock().pop_front() {
            Some(ConnectOutcome::Stream(stream)) => Ok(Box::new(stream)),
            Some(ConnectOutcome::Refused) | None => {
                Err(FeedError::transport("connection refused"))
            }
        }
    }
}

/// The receiving half of a scripted stream connection.
struct ScriptedStream {
    rx: mpsc::UnboundedReceiver<FeedResult<Vec<u8>>>,
}

#[async_trait]
impl FrameStream for ScriptedStream {
    async fn next_chunk(&mut self) -> FeedResult<Option<Vec<u8>>> {
        match self.rx.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => Err(err),
            // Script dropped: orderly close.
            None => Ok(None),
        }
    }
}

/// Feeds a scripted stream connection from a test.
///
/// Dropping the script closes the stream from the server side.
#[derive(Clone)]
pub struct StreamScript {
    tx: mpsc::UnboundedSender<FeedResult<Vec<u8>>>,
}

impl StreamScript {
    /// Sends raw bytes down the stream.
    pub fn send_chunk(&self, chunk: impl Into<Vec<u8>>) {
        let _ = self.tx.send(Ok(chunk.into()));
    }

    /// Sends one complete event frame carrying the given payload.
    pub fn send_event(&self, payload: &str) {
        self.send_chunk(format!("data: {payload}\n\n").into_bytes());
    }

    /// Sends a comment-line keepalive.
    pub fn send_keepalive(&self) {
        self.send_chunk(b": keepalive\n".to_vec());
    }

    /// Fails the stream with the given error.
    pub fn fail(&self, error: FeedError) {
        let _ = self.tx.send(Err(error));
    }
}

/// A mock poll fetcher with a sticky default body and an outcome queue.
///
/// Tracks call times and concurrent in-flight requests so overlap guarantees
/// can be asserted.
pub struct MockPollFetch {
    default_body: Mutex<Option<Vec<u8>>>,
    queued: Mutex<VecDeque<FeedResult<Vec<u8>>>>,
    latency: Mutex<Option<Duration>>,
    call_times: Mutex<Vec<tokio::time::Instant>>,
    active: AtomicU64,
    max_active: AtomicU64,
}

impl MockPollFetch {
    /// Creates a fetcher with no scripted responses (every fetch fails).
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            default_body: Mutex::new(None),
            queued: Mutex::new(VecDeque::new()),
            latency: Mutex::new(None),
            call_times: Mutex::new(Vec::new()),
            active: AtomicU64::new(0),
            max_active: AtomicU64::new(0),
        })
    }

    /// Sets the body returned when the outcome queue is empty.
    pub fn set_default_body(&self, body: impl Into<Vec<u8>>) {
        *self.default_body.lock() = Some(body.into());
    }

    /// Queues one fetch outcome, consumed before the default body.
    pub fn push_outcome(&self, outcome: FeedResult<Vec<u8>>) {
        self.queued.lock().push_back(outcome);
    }

    /// Makes every fetch take the given time before resolving.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Returns the number of fetches issued so far.
    pub fn call_count(&self) -> usize {
        self.call_times.lock().len()
    }

    /// Returns the recorded fetch start times.
    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.call_times.lock().clone()
    }

    /// Returns the maximum number of fetches that were ever in flight at
    /// the same time.
    pub fn max_in_flight(&self) -> u64 {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollFetch for MockPollFetch {
    async fn fetch(&self, _url: &str, _headers: &[(String, String)]) -> FeedResult<Vec<u8>> {
        self.call_times.lock().push(tokio::time::Instant::now());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(outcome) = self.queued.lock().pop_front() {
            return outcome;
        }
        self.default_body
            .lock()
            .clone()
            .ok_or_else(|| FeedError::transport("no response scripted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connector_refuses_when_script_is_empty() {
        let connector = MockStreamConnector::new();
        let result = connector.connect("http://test", &[]).await;
        assert!(matches!(result, Err(FeedError::Transport { .. })));
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn scripted_stream_yields_chunks_then_closes() {
        let connector = MockStreamConnector::new();
        let script = connector.push_stream();

        let mut stream = connector.connect("http://test", &[]).await.unwrap();
        script.send_chunk(b"hello".to_vec());
        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"hello".to_vec()));

        drop(script);
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn scripted_stream_propagates_failure() {
        let connector = MockStreamConnector::new();
        let script = connector.push_stream();

        let mut stream = connector.connect("http://test", &[]).await.unwrap();
        script.fail(FeedError::transport("connection reset"));
        assert!(stream.next_chunk().await.is_err());
    }

    #[tokio::test]
    async fn fetcher_prefers_queued_outcomes_over_default() {
        let fetcher = MockPollFetch::new();
        fetcher.set_default_body(b"default".to_vec());
        fetcher.push_outcome(Err(FeedError::transport("flaky tick")));

        assert!(fetcher.fetch("http://test", &[]).await.is_err());
        assert_eq!(
            fetcher.fetch("http://test", &[]).await.unwrap(),
            b"default".to_vec()
        );
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn fetcher_without_script_fails() {
        let fetcher = MockPollFetch::new();
        assert!(fetcher.fetch("http://test", &[]).await.is_err());
    }
}
