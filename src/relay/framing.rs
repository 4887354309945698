use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    #[default]
    Sse,
    Text,
}

impl Framing {
    pub fn content_type(self) -> &'static str {
        match self {
            Framing::Sse => "text/event-stream",
            Framing::Text => "text/plain; charset=utf-8",
        }
    }

    pub fn fragment(self, text: &str) -> Bytes {
        match self {
            Framing::Sse => sse_event(text),
            Framing::Text => Bytes::copy_from_slice(text.as_bytes()),
        }
    }

    // Sent once after a normal end of stream
    pub fn trailer(self, text: &str) -> Bytes {
        match self {
            Framing::Sse => sse_event(text),
            Framing::Text => Bytes::from(format!("\n{}", text)),
        }
    }

    // Sent once when the relay fails
    pub fn diagnostic(self, err: &RelayError) -> Bytes {
        match (self, err) {
            (Framing::Sse, err) => sse_event(&format!("[error: {}]", err.class())),
            (Framing::Text, RelayError::Status(code)) => {
                Bytes::from(format!("\n[HTTP Error {}]", code))
            }
            (Framing::Text, err) => Bytes::from(format!("\n[Error: {}]", err.class())),
        }
    }

    // Sent alone when the stream never reaches upstream
    pub fn notice(self, text: &str) -> Bytes {
        match self {
            Framing::Sse => sse_event(text),
            Framing::Text => Bytes::copy_from_slice(text.as_bytes()),
        }
    }
}

// Every line of the text becomes its own data line; CRLF, CR and LF all end a line
fn sse_event(text: &str) -> Bytes {
    let text = text.replace("\r\n", "\n");
    let mut event = String::with_capacity(text.len() + 8);
    for line in text.split(['\r', '\n']) {
        event.push_str("data: ");
        event.push_str(line);
        event.push('\n');
    }
    event.push('\n');
    Bytes::from(event)
}
