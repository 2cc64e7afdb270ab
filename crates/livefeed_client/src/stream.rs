//! The push-stream channel: framing plus heartbeat supervision.

use crate::error::{FeedError, FeedResult};
use crate::sse::{SseDecoder, SseEvent};
use crate::transport::FrameStream;
use std::collections::VecDeque;
use std::time::Duration;

/// Wraps one open stream connection and yields decoded event payloads.
///
/// Any chunk, including a keepalive comment, resets the heartbeat window; a
/// server publishing nothing for the full window is indistinguishable from a
/// dead connection, so the channel synthesizes a transport error. Dropping
/// the channel closes the underlying connection.
pub struct StreamChannel {
    frames: Box<dyn FrameStream>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    heartbeat: Duration,
}

impl StreamChannel {
    /// Creates a channel over an open connection.
    pub fn new(frames: Box<dyn FrameStream>, heartbeat: Duration) -> Self {
        Self {
            frames,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            heartbeat,
        }
    }

    /// Returns the next event payload.
    ///
    /// Errors are always transport-level: connection drop, orderly server
    /// close, or heartbeat expiry. Payload text is returned undecoded; JSON
    /// interpretation (and its distinct parse-error path) is the caller's.
    pub async fn next_payload(&mut self) -> FeedResult<String> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                return Ok(payload);
            }

            let chunk = match tokio::time::timeout(self.heartbeat, self.frames.next_chunk()).await
            {
                Err(_) => return Err(FeedError::HeartbeatTimeout),
                Ok(Err(err)) => return Err(err),
                Ok(Ok(None)) => return Err(FeedError::transport("stream closed by server")),
                Ok(Ok(Some(chunk))) => chunk,
            };

            for event in self.decoder.feed(&chunk) {
                match event {
                    SseEvent::Message(payload) => self.pending.push_back(payload),
                    // Arrival alone already reset the heartbeat window.
                    SseEvent::Keepalive => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockStreamConnector, StreamConnector};
    use tokio::time::Instant;

    const HEARTBEAT: Duration = Duration::from_millis(120_000);

    async fn open_scripted() -> (crate::transport::StreamScript, StreamChannel) {
        let connector = MockStreamConnector::new();
        let script = connector.push_stream();
        let frames = connector.connect("http://test", &[]).await.unwrap();
        (script, StreamChannel::new(frames, HEARTBEAT))
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_event_payloads() {
        let (script, mut channel) = open_scripted().await;
        script.send_event("{\"success\":true}");
        assert_eq!(channel.next_payload().await.unwrap(), "{\"success\":true}");
    }

    #[tokio::test(start_paused = true)]
    async fn reassembles_frames_split_across_chunks() {
        let (script, mut channel) = open_scripted().await;
        script.send_chunk(b"data: {\"succ".to_vec());
        script.send_chunk(b"ess\":true}\n\n".to_vec());
        assert_eq!(channel.next_payload().await.unwrap(), "{\"success\":true}");
    }

    #[tokio::test(start_paused = true)]
    async fn queues_multiple_payloads_from_one_chunk() {
        let (script, mut channel) = open_scripted().await;
        script.send_chunk(b"data: one\n\ndata: two\n\n".to_vec());
        assert_eq!(channel.next_payload().await.unwrap(), "one");
        assert_eq!(channel.next_payload().await.unwrap(), "two");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_stream_times_out_after_heartbeat_window() {
        let (script, mut channel) = open_scripted().await;
        let start = Instant::now();

        let err = channel.next_payload().await.unwrap_err();
        assert!(matches!(err, FeedError::HeartbeatTimeout));
        assert_eq!(start.elapsed(), HEARTBEAT);
        drop(script);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalives_extend_the_heartbeat_window() {
        let (script, mut channel) = open_scripted().await;
        let start = Instant::now();

        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(60_000)).await;
                script.send_keepalive();
            }
            // Keep the connection open until the heartbeat fires.
            tokio::time::sleep(HEARTBEAT * 2).await;
            drop(script);
        });

        let err = channel.next_payload().await.unwrap_err();
        assert!(matches!(err, FeedError::HeartbeatTimeout));
        // Three keepalives at 60s spacing, then a full silent window.
        assert_eq!(start.elapsed(), Duration::from_millis(180_000) + HEARTBEAT);
    }

    #[tokio::test(start_paused = true)]
    async fn orderly_close_is_a_transport_error() {
        let (script, mut channel) = open_scripted().await;
        drop(script);

        let err = channel.next_payload().await.unwrap_err();
        assert!(err.is_transport());
        assert!(!matches!(err, FeedError::HeartbeatTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn connection_failure_propagates() {
        let (script, mut channel) = open_scripted().await;
        script.fail(FeedError::transport("connection reset"));

        let err = channel.next_payload().await.unwrap_err();
        assert!(matches!(err, FeedError::Transport { .. }));
    }
}
