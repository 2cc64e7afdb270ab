//! Connection supervision: transport selection, reconnection, fallback.
//!
//! The supervisor owns exactly one transport at a time. It opens the stream
//! transport first, reconnects with bounded exponential backoff, and after
//! exhausting the budget falls back to fixed-interval polling for the rest
//! of the session. Only an explicit [`ConnectionSupervisor::refresh`] makes
//! it try the stream again.

use crate::backoff::RetryState;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::poll::PollClient;
use crate::state::{ConnectionState, FeedStats};
use crate::stream::StreamChannel;
use crate::transport::{PollFetch, StreamConnector};
use livefeed_protocol::{normalize, ProtocolError, ResultsEnvelope, Snapshot};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Callback invoked with every normalized snapshot.
pub type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;
/// Callback invoked with every surfaced error.
pub type ErrorCallback = Box<dyn Fn(&FeedError) + Send + Sync>;
/// Callback invoked with every connection state transition.
pub type StatusCallback = Box<dyn Fn(ConnectionState) + Send + Sync>;

/// Commands from the public handle to the supervisor task.
enum Command {
    Refresh,
    Dispose,
}

struct Subscriber {
    id: u64,
    on_snapshot: SnapshotCallback,
    on_error: ErrorCallback,
    on_status: StatusCallback,
}

#[derive(Default)]
struct SubscriberTable {
    next_id: u64,
    entries: Vec<Arc<Subscriber>>,
}

/// State shared between the public handle and the supervisor task.
///
/// Callback fan-out runs under a dedicated dispatch gate, not the table
/// lock, so callbacks may freely subscribe, unsubscribe, or dispose.
/// `dispose` sets the tombstone and then waits on the gate, and the
/// tombstone is re-checked before every invocation; no callback runs after
/// `dispose` returns.
struct Shared {
    config: FeedConfig,
    connector: Arc<dyn StreamConnector>,
    fetcher: Arc<dyn PollFetch>,
    state: RwLock<ConnectionState>,
    stats: RwLock<FeedStats>,
    subscribers: Mutex<SubscriberTable>,
    dispatch_gate: Mutex<()>,
    dispatch_thread: Mutex<Option<ThreadId>>,
    disposed: AtomicBool,
}

impl Shared {
    /// Invokes one callback per subscriber, holding only the dispatch gate.
    ///
    /// The caller must hold the gate. The table lock is taken just long
    /// enough to snapshot the entries, and the tombstone is checked before
    /// each invocation so a dispose from inside a callback stops the
    /// fan-out at once.
    fn fan_out(&self, call: impl Fn(&Subscriber)) {
        *self.dispatch_thread.lock() = Some(thread::current().id());
        let entries = self.subscribers.lock().entries.clone();
        for sub in &entries {
            if self.disposed.load(Ordering::SeqCst) {
                break;
            }
            call(sub);
        }
        *self.dispatch_thread.lock() = None;
    }

    fn transition(&self, next: ConnectionState) {
        let _gate = self.dispatch_gate.lock();
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.state.write();
            if *state == next {
                return;
            }
            debug!(from = %*state, to = %next, "connection state changed");
            *state = next;
        }
        self.fan_out(|sub| (sub.on_status)(next));
    }

    fn publish_snapshot(&self, snapshot: &Snapshot) {
        let _gate = self.dispatch_gate.lock();
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut stats = self.stats.write();
            stats.snapshots_delivered += 1;
            stats.last_snapshot_time = Some(Instant::now());
        }
        self.fan_out(|sub| (sub.on_snapshot)(snapshot));
    }

    fn publish_error(&self, error: &FeedError) {
        let _gate = self.dispatch_gate.lock();
        if self.disposed.load(Ordering::SeqCst) {
            debug!(%error, "error discarded after dispose");
            return;
        }
        {
            let mut stats = self.stats.write();
            match error {
                FeedError::Parse(_) => stats.parse_errors += 1,
                FeedError::Application(_) => stats.application_errors += 1,
                err if err.is_transport() => stats.transport_errors += 1,
                _ => {}
            }
            stats.last_error = Some(error.to_string());
        }
        self.fan_out(|sub| (sub.on_error)(error));
    }

    /// Decodes and dispatches one payload.
    ///
    /// Parse failures and `success: false` envelopes are surfaced as errors
    /// without touching connection state or the retry budget.
    fn handle_payload(&self, payload: &str) {
        match serde_json::from_str::<ResultsEnvelope>(payload) {
            Err(err) => self.publish_error(&FeedError::Parse(err.to_string())),
            Ok(envelope) => match normalize(envelope) {
                Ok(snapshot) => self.publish_snapshot(&snapshot),
                Err(ProtocolError::ServerRejected { message }) => {
                    self.publish_error(&FeedError::Application(message))
                }
                Err(other) => self.publish_error(&FeedError::Parse(other.to_string())),
            },
        }
    }

    fn handle_payload_bytes(&self, payload: &[u8]) {
        self.handle_payload(&String::from_utf8_lossy(payload));
    }

    fn note_reconnect(&self) {
        self.stats.write().reconnect_attempts += 1;
    }

    fn note_poll_tick(&self) {
        self.stats.write().poll_ticks += 1;
    }
}

/// A registered subscriber handle.
///
/// Call [`Subscription::unsubscribe`] to stop deliveries. Dropping the
/// handle without unsubscribing leaves the subscription active until the
/// supervisor is disposed, matching the screen-lifetime contract of the
/// consuming UI.
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Removes this subscriber. Safe to call after dispose.
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            let mut table = shared.subscribers.lock();
            table.entries.retain(|sub| sub.id != self.id);
        }
    }
}

/// Supervises one live feed connection.
///
/// Created when the consuming screen mounts; [`ConnectionSupervisor::dispose`]
/// must be called exactly once when it unmounts (dropping the supervisor
/// disposes it as well). The two transports are owned exclusively by the
/// supervisor task and never outlive it.
///
/// Callbacks run on the supervisor task and may call back into the same
/// supervisor, including `subscribe`, `unsubscribe`, and `dispose`.
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor over the given transports. Call
    /// [`ConnectionSupervisor::start`] to begin connecting.
    pub fn new(
        config: FeedConfig,
        connector: Arc<dyn StreamConnector>,
        fetcher: Arc<dyn PollFetch>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                fetcher,
                state: RwLock::new(ConnectionState::Idle),
                stats: RwLock::new(FeedStats::default()),
                subscribers: Mutex::new(SubscriberTable::default()),
                dispatch_gate: Mutex::new(()),
                dispatch_thread: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
            cmd_tx,
            cmd_rx: Mutex::new(Some(cmd_rx)),
            task: Mutex::new(None),
        }
    }

    /// Starts connecting, stream transport first. Idempotent; a no-op after
    /// dispose. Must be called within a tokio runtime.
    pub fn start(&self) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return;
        }
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let Some(cmd_rx) = self.cmd_rx.lock().take() else {
            return;
        };
        *task = Some(tokio::spawn(run(Arc::clone(&self.shared), cmd_rx)));
    }

    /// Registers a subscriber. Deliveries begin with the next snapshot or
    /// transition produced; nothing already delivered is replayed.
    pub fn subscribe<S, E, T>(&self, on_snapshot: S, on_error: E, on_status: T) -> Subscription
    where
        S: Fn(&Snapshot) + Send + Sync + 'static,
        E: Fn(&FeedError) + Send + Sync + 'static,
        T: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let mut table = self.shared.subscribers.lock();
        if self.shared.disposed.load(Ordering::SeqCst) {
            return Subscription {
                id: 0,
                shared: Weak::new(),
            };
        }
        table.next_id += 1;
        let id = table.next_id;
        table.entries.push(Arc::new(Subscriber {
            id,
            on_snapshot: Box::new(on_snapshot),
            on_error: Box::new(on_error),
            on_status: Box::new(on_status),
        }));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Abandons the current transport and backoff timer, resets the retry
    /// budget, and reconnects stream-first — even after a fallback to
    /// polling. A no-op after dispose.
    pub fn refresh(&self) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return;
        }
        self.start();
        let _ = self.cmd_tx.send(Command::Refresh);
    }

    /// Tears the supervisor down. Synchronous and idempotent: closes the
    /// active transport, cancels any pending reconnect or poll timer, and
    /// guarantees that no subscriber callback runs after this returns.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.subscribers.lock().entries.clear();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        let _ = self.cmd_tx.send(Command::Dispose);
        // Wait out a fan-out running on another thread; once the gate is
        // held, the tombstone blocks any further invocation. When called
        // from inside a callback the dispatching thread is this one, and
        // the fan-out loop itself stops on the tombstone.
        let dispatching_here =
            *self.shared.dispatch_thread.lock() == Some(thread::current().id());
        if !dispatching_here {
            drop(self.shared.dispatch_gate.lock());
        }
        *self.shared.state.write() = ConnectionState::Closed;
        debug!("supervisor disposed");
    }

    /// Returns the current connection state.
    pub fn status(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    /// Returns a copy of the session statistics.
    pub fn stats(&self) -> FeedStats {
        self.shared.stats.read().clone()
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Outcome of driving the stream transport once.
enum StreamOutcome {
    /// Transport-level failure; consult the retry budget.
    Failed(FeedError),
    /// A refresh was requested.
    Refresh,
    /// Dispose requested or the handle is gone.
    Shutdown,
}

fn outcome_from(cmd: Option<Command>) -> StreamOutcome {
    match cmd {
        Some(Command::Refresh) => StreamOutcome::Refresh,
        Some(Command::Dispose) | None => StreamOutcome::Shutdown,
    }
}

/// The supervisor task: one session per refresh, stream phase then poll
/// fallback.
async fn run(shared: Arc<Shared>, mut cmds: mpsc::UnboundedReceiver<Command>) {
    let url = shared.config.results_url();

    'session: loop {
        let mut retry = RetryState::new();
        shared.transition(ConnectionState::Connecting);

        // Stream phase: reconnect with bounded backoff until exhausted.
        loop {
            let error = match drive_stream(&shared, &url, &mut cmds, &mut retry).await {
                StreamOutcome::Failed(error) => error,
                StreamOutcome::Refresh => continue 'session,
                StreamOutcome::Shutdown => return,
            };
            // Leave Streaming the moment the transport dies, not after the
            // backoff wait.
            shared.transition(ConnectionState::Connecting);
            shared.publish_error(&error);

            let Some(delay) = retry.next_delay(&shared.config.retry) else {
                break;
            };
            shared.note_reconnect();
            debug!(
                attempt = retry.attempts(),
                delay_ms = delay.as_millis() as u64,
                "scheduling stream reconnect"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                cmd = cmds.recv() => match outcome_from(cmd) {
                    StreamOutcome::Refresh => continue 'session,
                    _ => return,
                },
            }
        }

        // Poll fallback: permanent for the session, until an explicit refresh.
        warn!(
            attempts = shared.config.retry.max_attempts,
            "stream retries exhausted, falling back to polling"
        );
        shared.transition(ConnectionState::Polling);
        let mut poller = PollClient::new(
            Arc::clone(&shared.fetcher),
            url.clone(),
            shared.config.headers.clone(),
            shared.config.poll_interval,
            shared.config.poll_request_timeout,
        );
        loop {
            tokio::select! {
                cmd = cmds.recv() => match outcome_from(cmd) {
                    StreamOutcome::Refresh => continue 'session,
                    _ => return,
                },
                outcome = poller.tick() => {
                    shared.note_poll_tick();
                    match outcome {
                        Ok(body) => shared.handle_payload_bytes(&body),
                        Err(error) => shared.publish_error(&error),
                    }
                }
            }
        }
    }
}

/// Opens the stream and pumps payloads until it fails or a command arrives.
async fn drive_stream(
    shared: &Arc<Shared>,
    url: &str,
    cmds: &mut mpsc::UnboundedReceiver<Command>,
    retry: &mut RetryState,
) -> StreamOutcome {
    let connect = shared.connector.connect(url, &shared.config.headers);
    tokio::pin!(connect);

    let frames = tokio::select! {
        cmd = cmds.recv() => return outcome_from(cmd),
        result = &mut connect => match result {
            Ok(frames) => frames,
            Err(error) => return StreamOutcome::Failed(error),
        },
    };

    // Open succeeded: the consecutive-failure budget starts over.
    retry.reset();
    shared.transition(ConnectionState::Streaming);

    let mut channel = StreamChannel::new(frames, shared.config.stream_heartbeat_timeout);
    loop {
        tokio::select! {
            cmd = cmds.recv() => return outcome_from(cmd),
            payload = channel.next_payload() => match payload {
                Ok(text) => shared.handle_payload(&text),
                Err(error) => return StreamOutcome::Failed(error),
            },
        }
    }
}
