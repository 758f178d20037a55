//! Incremental parser for the feed's server-sent-event wire format.
//!
//! The feed is a `text/event-stream` body: UTF-8 lines carrying
//! `event:`, `data:`, `id:`, and `retry:` fields, comment lines
//! starting with `:`, and a blank line terminating each event. Chunks
//! arrive at arbitrary byte boundaries, so the parser buffers partial
//! lines between pushes. `id:` and `retry:` are accepted and ignored;
//! the dashboard's reconnect policy does not resume from event ids.

/// Default event name when the stream omits the `event:` field.
const DEFAULT_EVENT: &str = "message";

/// One complete event assembled from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name, `message` when the server sent none.
    pub event: String,
    /// Concatenated data payload (multi-line `data:` fields joined
    /// with newlines).
    pub data: String,
}

/// Incremental event-stream parser.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return every event it completes.
    ///
    /// Invalid UTF-8 is replaced rather than treated as fatal; the
    /// payloads are JSON and a corrupted frame fails JSON parsing
    /// downstream instead of wedging the connection.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=newline).collect();
            if line.ends_with('\n') {
                line.pop();
            }
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(event) = self.take_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Process one complete line; returns an event on the blank-line
    /// delimiter when data has accumulated.
    fn take_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.data.is_empty() {
                // Delimiter without data resets the event name only.
                self.event = None;
                return None;
            }
            let event = SseEvent {
                event: self
                    .event
                    .take()
                    .unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
                data: self.data.join("\n"),
            };
            self.data.clear();
            return Some(event);
        }

        // Comment line (used by servers as a keep-alive).
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            // A field with no colon is a field name with empty value.
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            // id/retry accepted, intentionally unused.
            "id" | "retry" => {}
            other => tracing::debug!(field = other, "ignoring unknown SSE field"),
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_event() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: build.update\ndata: {\"id\": 1}\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: String::from("build.update"),
                data: String::from("{\"id\": 1}"),
            }]
        );
    }

    #[test]
    fn reassembles_split_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: job.upd").is_empty());
        assert!(parser.push(b"ate\ndata: {\"a\"").is_empty());
        let events = parser.push(b": 2}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events.first().map(|e| e.event.as_str()),
            Some("job.update")
        );
        assert_eq!(events.first().map(|e| e.data.as_str()), Some("{\"a\": 2}"));
    }

    #[test]
    fn joins_multi_line_data() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: first\ndata: second\n\n");
        assert_eq!(events.first().map(|e| e.data.as_str()), Some("first\nsecond"));
        assert_eq!(events.first().map(|e| e.event.as_str()), Some("message"));
    }

    #[test]
    fn skips_comments_and_unknown_fields() {
        let mut parser = SseParser::new();
        let events = parser.push(b": keep-alive\nid: 42\nretry: 1000\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().map(|e| e.data.as_str()), Some("x"));
    }

    #[test]
    fn blank_line_without_data_emits_nothing() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"\n\n\n").is_empty());
        assert!(parser.push(b"event: orphan\n\n").is_empty());
        // The orphan event name does not leak into the next event.
        let events = parser.push(b"data: y\n\n");
        assert_eq!(events.first().map(|e| e.event.as_str()), Some("message"));
    }

    #[test]
    fn handles_crlf_lines() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: build.update\r\ndata: {}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().map(|e| e.data.as_str()), Some("{}"));
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: 1\n\ndata: 2\n\ndata: 3\n\n");
        let payloads: Vec<&str> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(payloads, vec!["1", "2", "3"]);
    }
}
