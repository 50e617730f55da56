//! Sentry envelope decoding
//!
//! An envelope is a newline-delimited container: one JSON header line, then
//! zero or more items, each an item-header line followed by a payload.
//! Payloads with a declared `length` are read byte-exact and may themselves
//! contain newlines; items without a length occupy a single line.

use serde::Deserialize;

/// Envelope-level header (first line)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeHeader {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub sent_at: String,
    #[serde(default)]
    pub dsn: String,
}

/// Per-item header
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemHeader {
    #[serde(default, rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub length: Option<usize>,
    #[serde(default)]
    pub content_type: String,
}

/// One decoded envelope item with its raw payload bytes
#[derive(Debug, Clone)]
pub struct EnvelopeItem {
    pub header: ItemHeader,
    pub payload: Vec<u8>,
}

/// A fully decoded envelope
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub header: EnvelopeHeader,
    pub items: Vec<EnvelopeItem>,
}

/// Decode an envelope from raw request bytes
///
/// Malformed item headers skip forward to the next candidate line. A payload
/// truncated short of its declared length stops decoding but keeps the items
/// decoded so far.
pub fn parse_envelope(body: &[u8]) -> Envelope {
    let mut cursor = Cursor { buf: body, pos: 0 };

    let header = cursor
        .read_line()
        .and_then(|line| serde_json::from_slice(line).ok())
        .unwrap_or_default();

    let mut items = Vec::new();
    while let Some(line) = cursor.read_line() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let item_header: ItemHeader = match serde_json::from_slice(line) {
            Ok(h) => h,
            Err(_) => continue,
        };

        let payload = match item_header.length {
            Some(length) => match cursor.read_exact(length) {
                Some(bytes) => {
                    cursor.consume_newline();
                    bytes.to_vec()
                }
                // Truncated payload: stop, keep what we have
                None => break,
            },
            None => match cursor.read_line() {
                Some(line) => line.to_vec(),
                None => break,
            },
        };

        items.push(EnvelopeItem {
            header: item_header,
            payload,
        });
    }

    Envelope { header, items }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Read up to the next `\n` (exclusive), or to the end of the buffer
    fn read_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let rest = &self.buf[self.pos..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(idx) => {
                self.pos += idx + 1;
                Some(&rest[..idx])
            }
            None => {
                self.pos = self.buf.len();
                Some(rest)
            }
        }
    }

    /// Read exactly `n` raw bytes; `None` if fewer remain
    fn read_exact(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            self.pos = self.buf.len();
            return None;
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(bytes)
    }

    fn consume_newline(&mut self) {
        if self.buf.get(self.pos) == Some(&b'\n') {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_envelope() {
        let envelope = parse_envelope(b"{\"event_id\":\"abc\"}\n");
        assert_eq!(envelope.header.event_id, "abc");
        assert!(envelope.items.is_empty());
    }

    #[test]
    fn test_single_item_with_length() {
        let body = b"{\"event_id\":\"1\"}\n{\"type\":\"event\",\"length\":13}\n{\"level\":\"x\"}\n";
        let envelope = parse_envelope(body);

        assert_eq!(envelope.items.len(), 1);
        assert_eq!(envelope.items[0].header.item_type, "event");
        assert_eq!(envelope.items[0].payload, b"{\"level\":\"x\"}");
    }

    #[test]
    fn test_payload_containing_newlines() {
        let payload = b"line one\nline two";
        let body = format!(
            "{{}}\n{{\"type\":\"attachment\",\"length\":{}}}\n",
            payload.len()
        );
        let mut bytes = body.into_bytes();
        bytes.extend_from_slice(payload);
        bytes.push(b'\n');

        let envelope = parse_envelope(&bytes);
        assert_eq!(envelope.items.len(), 1);
        assert_eq!(envelope.items[0].payload, payload);
    }

    #[test]
    fn test_multiple_items() {
        let body = b"{}\n{\"type\":\"transaction\",\"length\":2}\n{}\n{\"type\":\"event\",\"length\":2}\n{}\n";
        let envelope = parse_envelope(body);

        assert_eq!(envelope.items.len(), 2);
        assert_eq!(envelope.items[0].header.item_type, "transaction");
        assert_eq!(envelope.items[1].header.item_type, "event");
    }

    #[test]
    fn test_malformed_item_header_is_skipped() {
        let body = b"{}\nnot json at all\n{\"type\":\"event\",\"length\":2}\n{}\n";
        let envelope = parse_envelope(body);

        assert_eq!(envelope.items.len(), 1);
        assert_eq!(envelope.items[0].header.item_type, "event");
    }

    #[test]
    fn test_truncated_payload_keeps_prior_items() {
        let body = b"{}\n{\"type\":\"event\",\"length\":2}\n{}\n{\"type\":\"event\",\"length\":9999}\n{}";
        let envelope = parse_envelope(body);

        assert_eq!(envelope.items.len(), 1);
    }

    #[test]
    fn test_item_without_length_is_line_based() {
        let body = b"{}\n{\"type\":\"event\"}\n{\"level\":\"error\"}\n";
        let envelope = parse_envelope(body);

        assert_eq!(envelope.items.len(), 1);
        assert_eq!(envelope.items[0].payload, b"{\"level\":\"error\"}");
    }

    #[test]
    fn test_unparseable_envelope_header_yields_default() {
        let envelope = parse_envelope(b"garbage\n{\"type\":\"event\",\"length\":2}\n{}\n");
        assert_eq!(envelope.header.event_id, "");
        assert_eq!(envelope.items.len(), 1);
    }

    #[test]
    fn test_blank_lines_between_items() {
        let body = b"{}\n\n{\"type\":\"event\",\"length\":2}\n{}\n\n";
        let envelope = parse_envelope(body);
        assert_eq!(envelope.items.len(), 1);
    }
}
