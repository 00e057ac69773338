//! Incremental SSE framing for `streamGenerateContent?alt=sse` and
//! Interactions streams.
//!
//! Bytes may arrive split at arbitrary boundaries, including inside a UTF-8
//! sequence; [`SseParser`] buffers partial lines and yields complete events.

use memchr::memchr_iter;

/// One dispatched SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// `[DONE]` sentinel some proxies append after the last frame.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE line parser.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    read_offset: usize,
    utf8_tail: Vec<u8>,
    event_type: Option<String>,
    data_buffer: String,
    has_data: bool,
    last_event_id: Option<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed text and return the events it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw bytes. A UTF-8 sequence cut at the end of `bytes` is held
    /// back until the next call completes it; invalid bytes become U+FFFD.
    pub fn feed_bytes_into(&mut self, bytes: &[u8], out: &mut Vec<SseEvent>) {
        let owned;
        let mut input: &[u8] = if self.utf8_tail.is_empty() {
            bytes
        } else {
            owned = [std::mem::take(&mut self.utf8_tail).as_slice(), bytes].concat();
            &owned
        };
        if let Ok(text) = std::str::from_utf8(input) {
            self.feed_into(text, out);
            return;
        }

        let mut text = String::with_capacity(input.len());
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = input.split_at(err.valid_up_to());
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    let Some(invalid_len) = err.error_len() else {
                        self.utf8_tail.extend_from_slice(after);
                        break;
                    };
                    tracing::warn!(invalid_len, "invalid UTF-8 in SSE stream, replacing");
                    text.push(char::REPLACEMENT_CHARACTER);
                    input = &after[invalid_len..];
                }
            }
        }
        self.feed_into(&text, out);
    }

    /// Feed text and append complete events into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<SseEvent>) {
        self.buffer.push_str(chunk);
        let mut processed_up_to = self.read_offset;
        let scan_start = processed_up_to;
        for rel_pos in memchr_iter(b'\n', &self.buffer.as_bytes()[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let line = &self.buffer[processed_up_to..line_end];
            let line = line.strip_suffix('\r').unwrap_or(line);
            Self::process_line(
                line,
                &mut self.event_type,
                &mut self.data_buffer,
                &mut self.has_data,
                &mut self.last_event_id,
                out,
            );
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
        } else if self.read_offset >= self.buffer.len() / 2 {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    /// Dispatch a trailing event that was not followed by a blank line.
    pub fn flush_into(&mut self, out: &mut Vec<SseEvent>) {
        if self.read_offset < self.buffer.len() {
            self.feed_into("\n", out);
        }
        self.feed_into("\n", out);
    }

    fn process_line(
        line: &str,
        event_type: &mut Option<String>,
        data_buffer: &mut String,
        has_data: &mut bool,
        last_event_id: &mut Option<String>,
        events: &mut Vec<SseEvent>,
    ) {
        if line.is_empty() {
            if *has_data {
                events.push(SseEvent {
                    event: event_type.take(),
                    data: std::mem::take(data_buffer),
                    id: last_event_id.clone(),
                });
                *has_data = false;
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                if *has_data {
                    data_buffer.push('\n');
                } else {
                    *has_data = true;
                }
                data_buffer.push_str(value);
            }
            "event" => *event_type = Some(value.to_string()),
            "id" => *last_event_id = Some(value.to_string()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gemini_frames() {
        let mut parser = SseParser::new();
        let events = parser.feed(
            "data: {\"candidates\":[]}\r\n\r\ndata: {\"candidates\":[{}]}\r\n\r\n",
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"candidates\":[]}");
        assert!(events[1].event.is_none());
    }

    #[test]
    fn test_split_across_feeds() {
        let mut parser = SseParser::new();
        assert!(parser.feed("event: content.delta\nda").is_empty());
        assert!(parser.feed("ta: {\"a\":").is_empty());
        let events = parser.feed("1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("content.delta"));
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut parser = SseParser::new();
        let events = parser.feed(": ping\ndata: a\ndata: b\nid: 7\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: None,
                data: "a\nb".into(),
                id: Some("7".into()),
            }]
        );
    }

    #[test]
    fn test_bytes_split_inside_utf8() {
        let mut parser = SseParser::new();
        let frame = "data: héllo\n\n".as_bytes();
        let split = frame.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut out = Vec::new();
        parser.feed_bytes_into(&frame[..split], &mut out);
        assert!(out.is_empty());
        parser.feed_bytes_into(&frame[split..], &mut out);
        assert_eq!(out[0].data, "héllo");
    }

    #[test]
    fn test_invalid_byte_keeps_split_sequence() {
        let mut parser = SseParser::new();
        let mut out = Vec::new();
        parser.feed_bytes_into(b"data: a\xFFb\xC3", &mut out);
        assert!(out.is_empty());
        parser.feed_bytes_into(b"\xA9\n\n", &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, "a\u{FFFD}bé");
    }

    #[test]
    fn test_flush_trailing_event() {
        let mut parser = SseParser::new();
        let mut out = Vec::new();
        parser.feed_into("data: last", &mut out);
        assert!(out.is_empty());
        parser.flush_into(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, "last");
    }

    #[test]
    fn test_done_sentinel() {
        let event = SseEvent {
            data: "[DONE]".into(),
            ..SseEvent::default()
        };
        assert!(event.is_done());
    }
}
