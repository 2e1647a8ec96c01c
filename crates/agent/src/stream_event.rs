//! Chat-level streaming events.
//!
//! `ChatEvent` is what a drain loop emits to clients: the gateway forwards
//! these over SSE, one event per fragment.

use agentchat_core::message::Message;
use serde::{Deserialize, Serialize};

/// Events emitted while draining a session.
///
/// - `fragment`: a piece of the answer, plus everything received so far
/// - `error`: the invocation failed
/// - `done`: the drain finished; carries the stored transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Fragment { text: String, pending: String },

    Error { message: String },

    Done { messages: Vec<Message> },
}

impl ChatEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Fragment { .. } => "fragment",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }
}
