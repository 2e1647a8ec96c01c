//! Message and conversation store types.
//!
//! A user submits a prompt → the user message is stored → the agent answers →
//! the full answer is stored as one assistant message. Partial output is never
//! written here; it only flows through the fragment queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the message was produced (set on assistant replies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Create a new assistant message stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// In-memory mapping from user id to that user's ordered transcript.
///
/// Transcripts are created lazily on the first append and live for the
/// process lifetime. With a history limit set, the oldest entries are
/// dropped once the limit is exceeded.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Mutex<HashMap<String, Vec<Message>>>,
    history_limit: Option<usize>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap each transcript at `limit` messages (drop-oldest).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit.max(1));
        self
    }

    /// Append a message to the user's transcript, preserving insertion order.
    pub fn append(&self, user_id: &str, message: Message) {
        let mut map = self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        let transcript = map.entry(user_id.to_string()).or_default();
        transcript.push(message);

        if let Some(limit) = self.history_limit {
            if transcript.len() > limit {
                let excess = transcript.len() - limit;
                transcript.drain(..excess);
            }
        }
    }

    /// A copy of the user's transcript (empty if the user has none yet).
    pub fn transcript(&self, user_id: &str) -> Vec<Message> {
        let map = self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        map.get(user_id).cloned().unwrap_or_default()
    }

    /// The most recent assistant reply for this user, if any.
    pub fn last_assistant(&self, user_id: &str) -> Option<String> {
        let map = self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        map.get(user_id)?
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
    }

    pub fn len(&self, user_id: &str) -> usize {
        let map = self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        map.get(user_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, user_id: &str) -> bool {
        self.len(user_id) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_messages() {
        let user = Message::user("Hello, agent!");
        assert_eq!(user.role, Role::User);
        assert!(user.timestamp.is_none());

        let reply = Message::assistant("Hi");
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.timestamp.is_some());
    }

    #[test]
    fn store_preserves_order_per_user() {
        let store = ConversationStore::new();
        store.append("alice", Message::user("one"));
        store.append("bob", Message::user("other"));
        store.append("alice", Message::assistant("two"));

        let alice = store.transcript("alice");
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].content, "one");
        assert_eq!(alice[1].content, "two");
        assert_eq!(store.len("bob"), 1);
        assert!(store.is_empty("carol"));
    }

    #[test]
    fn history_limit_drops_oldest() {
        let store = ConversationStore::new().with_history_limit(3);
        for i in 0..5 {
            store.append("u", Message::user(format!("m{i}")));
        }
        let t = store.transcript("u");
        assert_eq!(t.len(), 3);
        assert_eq!(t[0].content, "m2");
        assert_eq!(t[2].content, "m4");
    }

    #[test]
    fn last_assistant_skips_user_messages() {
        let store = ConversationStore::new();
        assert!(store.last_assistant("u").is_none());
        store.append("u", Message::user("q1"));
        store.append("u", Message::assistant("a1"));
        store.append("u", Message::user("q2"));
        assert_eq!(store.last_assistant("u").as_deref(), Some("a1"));
    }

    #[test]
    fn message_serialization_omits_missing_timestamp() {
        let json = serde_json::to_string(&Message::user("Test")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Test"}"#);
    }
}
