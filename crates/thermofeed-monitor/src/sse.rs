//! Incremental server-sent events decoder.
//!
//! Bytes arrive in arbitrary chunks. [`SseDecoder`] buffers them until a
//! blank line closes an event, then yields that event's `data:` payload.
//! Multiple `data:` lines in one event are joined with `\n`; comment
//! lines (`:`) and other fields are ignored.

/// Buffers partial events between chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Feed one chunk and return the payloads of every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(end) = find_event_end(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end.saturating_add(2)).collect();
            if let Some(payload) = data_payload(&String::from_utf8_lossy(&event)) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Bytes held back waiting for the end of an event.
    pub const fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Index of the first `\n\n` in `buf`.
fn find_event_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Join the `data:` lines of one event; `None` if it has none.
fn data_payload(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
