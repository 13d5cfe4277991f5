//! Server-Sent Events decoding for the realtime database stream.
//!
//! The database streams `event:`/`data:` blocks separated by blank
//! lines. Chunks from the HTTP body may split a block (or a UTF-8
//! character) anywhere, so bytes are buffered until a block is complete.

use serde::Deserialize;
use serde_json::Value;

/// One complete event block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental decoder over raw body chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_block_end(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..end + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block[..end])) {
                events.push(event);
            }
        }
        events
    }
}

fn find_block_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = String::from("message");
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = value.to_string(),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() && event == "message" {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

/// Payload of `put` and `patch` events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamPayload {
    /// Location relative to the subscribed path, `/` for the path itself.
    pub path: String,
    pub data: Value,
}

/// Database stream event, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Replace the value at `path`.
    Put(StreamPayload),
    /// Replace each listed child below `path`.
    Patch(StreamPayload),
    KeepAlive,
    /// Server dropped the listener (rules no longer allow the read).
    Cancel(String),
    /// Credentials expired.
    AuthRevoked(String),
    Unknown(String),
}

impl StreamEvent {
    /// Interpret a raw event block.
    pub fn from_sse(raw: &SseEvent) -> Result<Self, serde_json::Error> {
        Ok(match raw.event.as_str() {
            "put" => Self::Put(serde_json::from_str(&raw.data)?),
            "patch" => Self::Patch(serde_json::from_str(&raw.data)?),
            "keep-alive" => Self::KeepAlive,
            "cancel" => Self::Cancel(raw.data.clone()),
            "auth_revoked" => Self::AuthRevoked(raw.data.clone()),
            other => Self::Unknown(other.to_string()),
        })
    }
}
