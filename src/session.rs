// src/session.rs
//! Conversation store for the general (non-legal) chat path.
//!
//! Every conversation starts with exactly one system message. Each session key
//! has its own async mutex, so concurrent requests for the same session
//! serialise while different sessions proceed independently.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered history, always led by one system message.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends user/assistant turns; system messages are ignored.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role != Role::System {
            self.messages.push(message);
        }
    }

    /// Drop the trailing user turn after a failed generation.
    pub fn pop_user(&mut self) {
        if self.messages.len() > 1
            && self.messages.last().map(|m| m.role) == Some(Role::User)
        {
            self.messages.pop();
        }
    }
}

pub type SharedConversation = Arc<AsyncMutex<Conversation>>;

/// Session-keyed conversation storage.
pub trait SessionStore: Send + Sync {
    /// Existing conversation for `key`, or a fresh one seeded with the system prompt.
    fn get_or_create(&self, key: &str) -> SharedConversation;
    /// Forget `key`; returns whether it existed.
    fn clear(&self, key: &str) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store; conversations live until cleared.
pub struct InMemorySessionStore {
    system_prompt: String,
    sessions: Mutex<HashMap<String, SharedConversation>>,
}

impl InMemorySessionStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, key: &str) -> SharedConversation {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Conversation::new(&self.system_prompt))))
            .clone()
    }

    fn clear(&self, key: &str) -> bool {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.sessions
            .lock()
            .map(|m| m.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conversation_starts_with_single_system_message() {
        let store = InMemorySessionStore::new("sistema");
        let conv = store.get_or_create("a");
        let mut guard = conv.lock().await;
        assert_eq!(guard.len(), 1);
        assert_eq!(guard.messages()[0].role, Role::System);

        guard.push(ChatMessage::system("otro"));
        guard.push(ChatMessage::user("hola"));
        guard.push(ChatMessage::assistant("¡hola!"));
        assert_eq!(guard.len(), 3);
        assert_eq!(
            guard.messages().iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[tokio::test]
    async fn same_key_shares_history_and_clear_resets() {
        let store = InMemorySessionStore::new("sistema");
        store
            .get_or_create("a")
            .lock()
            .await
            .push(ChatMessage::user("uno"));
        assert_eq!(store.get_or_create("a").lock().await.len(), 2);
        assert_eq!(store.get_or_create("b").lock().await.len(), 1);
        assert_eq!(store.len(), 2);

        assert!(store.clear("a"));
        assert!(!store.clear("a"));
        assert_eq!(store.get_or_create("a").lock().await.len(), 1);
    }

    #[test]
    fn pop_user_never_removes_system() {
        let mut c = Conversation::new("s");
        c.pop_user();
        assert_eq!(c.len(), 1);
        c.push(ChatMessage::user("u"));
        c.pop_user();
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }
}
