//! Wire messages exchanged with streaming clients.
//!
//! Every server-to-client frame is a JSON object tagged by `type`. The
//! shapes are part of the client contract and must stay stable.

use serde::{Deserialize, Serialize};

/// Server → client stream messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// One-shot backlog batch, sent immediately after subscribe.
    InitialLogs { logs: Vec<String> },
    /// A single live line, in production order.
    NewLog { log: String },
    /// A client-visible failure: crashed source, unknown id, or a gap
    /// after the subscriber fell behind. The connection stays open
    /// unless a close frame follows.
    Error { message: String },
    /// Reply to a client ping.
    Pong,
}

impl StreamMessage {
    /// Serialize for the wire. Message construction is infallible, so a
    /// serialization failure is a programming error worth propagating.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("stream message serializes")
    }
}

/// Client → server stream messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keep-alive probe; answered with [`StreamMessage::Pong`].
    Ping,
}
