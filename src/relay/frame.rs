// Upstream SSE decoding: `data: <json>` lines until `data: [DONE]`

use bytes::BytesMut;

use crate::models::CompletionChunk;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    // choices[0].delta.content
    Content(String),
    Done,
    Ignored,
    // reason is for logs only
    Malformed(String),
}

pub fn parse_line(line: &str) -> Frame {
    let line = line.strip_suffix('\r').unwrap_or(line);

    let Some(payload) = line.strip_prefix("data:") else {
        return Frame::Ignored;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload).trim();

    if payload.is_empty() {
        return Frame::Ignored;
    }
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => match chunk.into_content() {
            Some(text) if !text.is_empty() => Frame::Content(text),
            _ => Frame::Ignored,
        },
        Err(e) => Frame::Malformed(format!("json: {}", e)),
    }
}

// Longest line kept while waiting for its newline
pub const MAX_LINE_BYTES: usize = 256 * 1024;

// Partial lines stay raw bytes until their newline, so split characters decode intact
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    // bytes of `buffer` already known to hold no newline
    scanned: usize,
    max_line: usize,
    // inside an oversized line, dropping bytes up to its newline
    discarding: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_line,
            discarding: false,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.extend_from_slice(b"\n");
        }
    }

    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
                return self.overflow();
            };

            let mut line = self.buffer.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) {
                // tail of a line already reported
                continue;
            }

            line.truncate(line.len() - 1);
            if line.len() > self.max_line {
                return Some(too_long(self.max_line));
            }
            return Some(match std::str::from_utf8(&line) {
                Ok(text) => parse_line(text),
                Err(_) => Frame::Malformed("invalid utf-8".to_string()),
            });
        }
    }

    // No newline buffered: remember how far we looked, drop runaway lines
    fn overflow(&mut self) -> Option<Frame> {
        self.scanned = self.buffer.len();
        if self.buffer.len() <= self.max_line {
            return None;
        }

        self.buffer.clear();
        self.scanned = 0;
        if self.discarding {
            return None;
        }
        self.discarding = true;
        Some(too_long(self.max_line))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn too_long(max_line: usize) -> Frame {
    Frame::Malformed(format!("line longer than {} bytes", max_line))
}
