//! # Event-stream parser
//!
//! Turns a chunked HTTP byte stream into [`SseEvent`]s:
//! - Line buffering across chunk boundaries (`\n` or `\r\n`)
//! - `event:` / `data:` field accumulation, dispatched on a blank line
//! - Comment lines (`: ping`) skipped
//! - Multi-line `data:` joined with `\n`

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Event name used when a frame has no `event:` field.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One dispatched event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name (`message` when absent).
    pub event: String,
    /// Joined `data:` lines.
    pub data: String,
}

/// Incremental line-level decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator). Returns an event on a blank line.
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_owned()),
            data,
        })
    }
}

/// Parse events from a byte stream.
///
/// The stream ends when the underlying stream ends or yields an error (the
/// error is logged). A partial frame at the end is discarded.
pub fn parse_sse_events<S, E>(byte_stream: S) -> impl Stream<Item = SseEvent> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), SseDecoder::new()),
        |(mut stream, mut buffer, mut decoder)| async move {
            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        continue;
                    };
                    if let Some(event) = decoder.push_line(line) {
                        return Some((event, (stream, buffer, decoder)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        warn!("event stream read error: {e}");
                        return None;
                    }
                    None => return None,
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + Unpin + use<> {
        let items: Vec<Result<Bytes, io::Error>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        futures::stream::iter(items)
    }

    async fn collect(parts: &[&'static str]) -> Vec<SseEvent> {
        parse_sse_events(chunks(parts)).collect().await
    }

    // ── SseDecoder ───────────────────────────────────────────────────────

    #[test]
    fn decoder_named_event() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push_line("event: udp"), None);
        assert_eq!(d.push_line("data: {\"a\":1}"), None);
        assert_eq!(
            d.push_line(""),
            Some(SseEvent {
                event: "udp".into(),
                data: "{\"a\":1}".into(),
            })
        );
    }

    #[test]
    fn decoder_skips_comments() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push_line(": connected"), None);
        assert_eq!(d.push_line(""), None);
        assert_eq!(d.push_line(": ping"), None);
        assert_eq!(d.push_line(""), None);
    }

    #[test]
    fn decoder_defaults_event_name() {
        let mut d = SseDecoder::new();
        let _ = d.push_line("data:x");
        assert_eq!(d.push_line("").unwrap().event, DEFAULT_EVENT_NAME);
    }

    #[test]
    fn decoder_joins_multiline_data() {
        let mut d = SseDecoder::new();
        let _ = d.push_line("data: a");
        let _ = d.push_line("data: b");
        assert_eq!(d.push_line("").unwrap().data, "a\nb");
    }

    #[test]
    fn decoder_event_without_data_is_dropped() {
        let mut d = SseDecoder::new();
        let _ = d.push_line("event: udp");
        assert_eq!(d.push_line(""), None);
        let _ = d.push_line("data: next");
        assert_eq!(d.push_line("").unwrap().event, DEFAULT_EVENT_NAME);
    }

    #[test]
    fn decoder_ignores_unknown_fields() {
        let mut d = SseDecoder::new();
        let _ = d.push_line("id: 7");
        let _ = d.push_line("retry: 1000");
        let _ = d.push_line("data: x");
        assert_eq!(d.push_line("").unwrap().data, "x");
    }

    // ── parse_sse_events ─────────────────────────────────────────────────

    #[tokio::test]
    async fn parses_server_stream() {
        let events = collect(&[
            ": connected\n\n",
            "event: udp\ndata: {\"text\":\"end=1\"}\n\n",
            ": ping\n\n",
            "event: udp\ndata: {\"text\":\"end=2\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "udp");
        assert_eq!(events[0].data, "{\"text\":\"end=1\"}");
        assert_eq!(events[1].data, "{\"text\":\"end=2\"}");
    }

    #[tokio::test]
    async fn frame_split_across_chunks() {
        let events = collect(&["eve", "nt: udp\nda", "ta: hel", "lo\n", "\n"]).await;
        assert_eq!(
            events,
            vec![SseEvent {
                event: "udp".into(),
                data: "hello".into(),
            }]
        );
    }

    #[tokio::test]
    async fn crlf_line_endings() {
        let events = collect(&["event: udp\r\ndata: x\r\n\r\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[tokio::test]
    async fn partial_trailing_frame_discarded() {
        let events = collect(&["event: udp\ndata: x\n"]).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn read_error_ends_stream() {
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"data: a\n\n")),
            Err(io::Error::other("reset")),
            Ok(Bytes::from_static(b"data: b\n\n")),
        ];
        let events: Vec<SseEvent> = parse_sse_events(futures::stream::iter(items)).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a");
    }
}
