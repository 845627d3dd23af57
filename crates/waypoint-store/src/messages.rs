// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only chat message collection.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use waypoint_core::types::{MESSAGE_COLLECTION_KEY, TYPING_KEY};
use waypoint_core::{ConversationKey, Message, RealtimeStore, RelayError};

/// Writes immutable messages under their writer-generated ids.
///
/// Re-issuing an append for the same message targets the same key, so
/// retries never duplicate a message.
#[derive(Clone)]
pub struct MessageStore {
    store: Arc<dyn RealtimeStore>,
}

impl MessageStore {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Write `message` at `messages/message_id/{message.id}`.
    pub async fn append(&self, key: &ConversationKey, message: &Message) -> Result<(), RelayError> {
        let path = key.message_path(&message.id);
        self.store.set(&path, encode(message, &path)?).await?;
        debug!(conversation = %key, message_id = %message.id, sender = %message.sender, "message appended");
        Ok(())
    }

    /// Write `message` and the typing flag in one atomic multi-path update.
    pub async fn append_with_typing(
        &self,
        key: &ConversationKey,
        message: &Message,
        typing: bool,
    ) -> Result<(), RelayError> {
        let node = key.messages_node();
        let mut fields = Map::new();
        fields.insert(
            format!("{MESSAGE_COLLECTION_KEY}/{}", message.id),
            encode(message, &node)?,
        );
        fields.insert(TYPING_KEY.to_string(), Value::Bool(typing));
        self.store.update(&node, fields).await?;
        debug!(conversation = %key, message_id = %message.id, typing, "message appended with typing flag");
        Ok(())
    }

    /// Read every message of a conversation, oldest first.
    ///
    /// Entries that do not decode as a [`Message`] are skipped.
    pub async fn list(&self, key: &ConversationKey) -> Result<Vec<Message>, RelayError> {
        let Some(Value::Object(entries)) = self.store.get(&key.message_collection_path()).await?
        else {
            return Ok(Vec::new());
        };

        let mut messages: Vec<Message> = entries
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value::<Message>(value) {
                Ok(message) => Some(message),
                Err(e) => {
                    debug!(conversation = %key, message_id = %id, error = %e, "skipping undecodable message");
                    None
                }
            })
            .collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(messages)
    }
}

fn encode(message: &Message, path: &str) -> Result<Value, RelayError> {
    serde_json::to_value(message).map_err(|e| RelayError::Persistence {
        path: path.to_string(),
        message: format!("failed to encode message: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde_json::json;
    use waypoint_core::Sender;

    fn key() -> ConversationKey {
        ConversationKey::new("user123", "itinerary456").unwrap()
    }

    #[tokio::test]
    async fn append_writes_under_message_id() {
        let memory = Arc::new(MemoryStore::new());
        let messages = MessageStore::new(memory.clone());
        let msg = Message::user("Hello, I need help with my trip.");
        messages.append(&key(), &msg).await.unwrap();

        let stored = memory
            .get(&key().message_path(&msg.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["sender"], "user");
        assert_eq!(stored["message"], "Hello, I need help with my trip.");
        assert_eq!(stored["message_type"], "text");
    }

    #[tokio::test]
    async fn append_is_idempotent_per_id() {
        let memory = Arc::new(MemoryStore::new());
        let messages = MessageStore::new(memory);
        let msg = Message::user("twice");
        messages.append(&key(), &msg).await.unwrap();
        messages.append(&key(), &msg).await.unwrap();
        assert_eq!(messages.list(&key()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn append_with_typing_clears_flag_alongside_reply() {
        let memory = Arc::new(MemoryStore::new());
        memory.set(&key().typing_path(), json!(true)).await.unwrap();
        let messages = MessageStore::new(memory.clone());
        let reply = Message::model("Paris is lovely");
        messages.append_with_typing(&key(), &reply, false).await.unwrap();

        assert_eq!(
            memory.get(&key().typing_path()).await.unwrap(),
            Some(json!(false))
        );
        let listed = messages.list(&key()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sender, Sender::Model);
    }

    #[tokio::test]
    async fn list_orders_by_timestamp_and_skips_garbage() {
        let memory = Arc::new(MemoryStore::new());
        let messages = MessageStore::new(memory.clone());
        let mut late = Message::model("second");
        late.timestamp = "2026-05-01T10:00:01+00:00".to_string();
        let mut early = Message::user("first");
        early.timestamp = "2026-05-01T10:00:00+00:00".to_string();
        messages.append(&key(), &late).await.unwrap();
        messages.append(&key(), &early).await.unwrap();
        memory
            .set(&key().message_path("junk"), json!({"unexpected": 1}))
            .await
            .unwrap();

        let listed = messages.list(&key()).await.unwrap();
        let texts: Vec<&str> = listed.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn empty_conversation_lists_nothing() {
        let messages = MessageStore::new(Arc::new(MemoryStore::new()));
        assert!(messages.list(&key()).await.unwrap().is_empty());
    }
}
