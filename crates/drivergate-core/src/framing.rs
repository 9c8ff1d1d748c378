//! Wire framing for the driver byte stream
//!
//! The driver protocol defines no delimiter: whatever a single read returns
//! is one message ([`Framing::Raw`]). When both ends agree on it,
//! [`Framing::Line`] terminates every message with `\n` instead, which
//! survives reads that split or coalesce messages.

use std::fmt;
use std::str::FromStr;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

/// Message framing on the driver connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// One read is one message, no delimiter written
    #[default]
    Raw,
    /// Messages are terminated by `\n` (a preceding `\r` is dropped)
    Line,
}

impl Framing {
    /// Encode an outgoing message
    pub fn encode(&self, message: &str) -> Vec<u8> {
        match self {
            Framing::Raw => message.as_bytes().to_vec(),
            Framing::Line => {
                let mut bytes = Vec::with_capacity(message.len() + 1);
                bytes.extend_from_slice(message.as_bytes());
                bytes.push(b'\n');
                bytes
            }
        }
    }

    /// Whether `message` survives this framing as a single message
    ///
    /// Line framing cannot carry a `\n` or `\r` inside a message: the
    /// driver would see several commands and answer each of them.
    pub fn can_frame(&self, message: &str) -> bool {
        match self {
            Framing::Raw => true,
            Framing::Line => !message.contains(&['\n', '\r'][..]),
        }
    }

    /// Create a decoder for incoming bytes
    pub fn decoder(&self) -> FrameDecoder {
        FrameDecoder::new(*self)
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::Raw => write!(f, "raw"),
            Framing::Line => write!(f, "line"),
        }
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Framing::Raw),
            "line" => Ok(Framing::Line),
            other => Err(format!("unknown framing '{}' (expected raw or line)", other)),
        }
    }
}

/// Turns chunks read from the socket into complete messages
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: BytesMut::new(),
        }
    }

    /// Feed one chunk, returning every message it completes
    ///
    /// Invalid UTF-8 is decoded lossily.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match self.framing {
            Framing::Raw => {
                if chunk.is_empty() {
                    Vec::new()
                } else {
                    vec![String::from_utf8_lossy(chunk).into_owned()]
                }
            }
            Framing::Line => {
                self.buffer.extend_from_slice(chunk);
                let mut messages = Vec::new();
                while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                    let mut line = self.buffer.split_to(pos + 1);
                    line.truncate(pos);
                    if line.last() == Some(&b'\r') {
                        line.truncate(pos - 1);
                    }
                    messages.push(String::from_utf8_lossy(&line).into_owned());
                }
                messages
            }
        }
    }

    /// Number of buffered bytes not yet forming a complete message
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial message (used when the connection is replaced)
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
