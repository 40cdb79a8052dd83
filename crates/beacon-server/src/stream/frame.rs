//! Event-stream frames.
//!
//! A [`Frame`] is queued once per subscriber, so payloads are `Arc<str>` and
//! cloning is a refcount bump.

use std::sync::Arc;

use axum::response::sse::Event;

/// Comment written when a subscriber connects.
pub const CONNECTED_COMMENT: &str = "connected";

/// Comment written by the heartbeat.
pub const PING_COMMENT: &str = "ping";

/// One frame on an event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Comment line (`: <text>`), ignored by clients.
    Comment(Arc<str>),
    /// Named event with a data payload.
    Event {
        /// Event name (`event:` field).
        name: Arc<str>,
        /// Payload (`data:` field).
        data: Arc<str>,
    },
}

impl Frame {
    /// A comment frame.
    pub fn comment(text: &str) -> Self {
        Self::Comment(Arc::from(text))
    }

    /// A named event frame.
    ///
    /// `\r\n` and lone `\r` in `data` become `\n`, so every line break is
    /// written as its own `data:` line.
    pub fn event(name: &str, data: &str) -> Self {
        let data: Arc<str> = if data.contains('\r') {
            Arc::from(data.replace("\r\n", "\n").replace('\r', "\n"))
        } else {
            Arc::from(data)
        };
        Self::Event {
            name: Arc::from(name),
            data,
        }
    }

    /// The `: connected` frame.
    pub fn connected() -> Self {
        Self::comment(CONNECTED_COMMENT)
    }

    /// The `: ping` frame.
    pub fn ping() -> Self {
        Self::comment(PING_COMMENT)
    }

    /// Convert to an axum SSE event for the response body.
    pub fn to_sse(&self) -> Event {
        match self {
            Self::Comment(text) => Event::default().comment(text.as_ref()),
            Self::Event { name, data } => Event::default().event(name.as_ref()).data(data.as_ref()),
        }
    }

    /// Wire text of this frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Comment(text) => format!(": {text}\n\n"),
            Self::Event { name, data } => {
                let mut out = format!("event: {name}\n");
                for line in data.split('\n') {
                    out.push_str("data: ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_encoding() {
        assert_eq!(Frame::connected().encode(), ": connected\n\n");
        assert_eq!(Frame::ping().encode(), ": ping\n\n");
    }

    #[test]
    fn event_encoding() {
        let frame = Frame::event("udp", r#"{"text":"end=3"}"#);
        assert_eq!(frame.encode(), "event: udp\ndata: {\"text\":\"end=3\"}\n\n");
    }

    #[test]
    fn multiline_data_splits_lines() {
        let frame = Frame::event("udp", "a\nb");
        assert_eq!(frame.encode(), "event: udp\ndata: a\ndata: b\n\n");
    }

    #[test]
    fn carriage_returns_become_line_breaks() {
        let frame = Frame::event("udp", "a\rb\r\nc");
        assert_eq!(frame.encode(), "event: udp\ndata: a\ndata: b\ndata: c\n\n");
        // axum rejects a raw carriage return in event data.
        let _ = frame.to_sse();
    }

    #[test]
    fn clone_shares_payload() {
        let frame = Frame::event("udp", "payload");
        let copy = frame.clone();
        match (&frame, &copy) {
            (Frame::Event { data: a, .. }, Frame::Event { data: b, .. }) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected event frames"),
        }
    }
}
