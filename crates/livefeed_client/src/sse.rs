//! Incremental decoder for event-stream framing.
//!
//! Frames follow the `text/event-stream` layout: `data:` lines accumulate an
//! event, an empty line dispatches it, and lines starting with `:` are
//! comments the server uses as keepalives. Field lines other than `data`
//! (`event:`, `id:`, `retry:`) are ignored; this feed carries one JSON
//! envelope per event and nothing else.

/// One decoded unit from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A complete event payload (the joined `data:` lines).
    Message(String),
    /// A comment line. Carries no data but counts as connection activity.
    Keepalive,
}

/// Incremental event-stream decoder.
///
/// Feed it raw chunks as they arrive; it buffers partial lines across chunk
/// boundaries and emits events as they complete.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    data_lines: Vec<String>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of bytes and returns the events completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=newline).collect();
            let line = raw.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    events.push(SseEvent::Message(self.data_lines.join("\n")));
                    self.data_lines.clear();
                }
            } else if line.starts_with(':') {
                events.push(SseEvent::Keepalive);
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data_lines
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // Other field lines are ignored.
        }
        events
    }
}
