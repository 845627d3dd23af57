// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for relay-level integration testing.
//!
//! `RelayHarness` wires a [`ChatRelay`] to a [`RecordingStore`] and a
//! [`ScriptedAgent`], so tests can send messages, wait for delegations to
//! settle, and inspect exactly what was written.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use waypoint_core::{ConversationKey, Message, RelayError};
use waypoint_relay::{ChatAccepted, ChatRelay, DelegationTracker};
use waypoint_store::MessageStore;

use crate::mock_agent::ScriptedAgent;
use crate::recording_store::RecordingStore;

/// Builder for creating relay test environments.
pub struct RelayHarnessBuilder {
    agent: Option<Arc<ScriptedAgent>>,
    store: Option<Arc<RecordingStore>>,
    history_limit: usize,
}

impl RelayHarnessBuilder {
    fn new() -> Self {
        Self {
            agent: None,
            store: None,
            history_limit: 64,
        }
    }

    /// Use a pre-configured agent instead of a default `ScriptedAgent`.
    pub fn with_agent(mut self, agent: ScriptedAgent) -> Self {
        self.agent = Some(Arc::new(agent));
        self
    }

    /// Share a store with the caller, e.g. to inject failures up front.
    pub fn with_store(mut self, store: Arc<RecordingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn build(self) -> RelayHarness {
        let store = self.store.unwrap_or_default();
        let agent = self.agent.unwrap_or_default();
        let tracker = Arc::new(DelegationTracker::new(self.history_limit));
        let relay = ChatRelay::new(store.clone(), agent.clone(), tracker.clone());
        RelayHarness {
            relay,
            store,
            agent,
            tracker,
        }
    }
}

/// A relay wired to in-process fakes.
pub struct RelayHarness {
    pub relay: ChatRelay,
    pub store: Arc<RecordingStore>,
    pub agent: Arc<ScriptedAgent>,
    pub tracker: Arc<DelegationTracker>,
}

impl RelayHarness {
    pub fn builder() -> RelayHarnessBuilder {
        RelayHarnessBuilder::new()
    }

    /// Send one chat message through the relay.
    pub async fn send(
        &self,
        user_id: &str,
        itinerary_id: &str,
        text: &str,
    ) -> Result<ChatAccepted, RelayError> {
        let key = ConversationKey::new(user_id, itinerary_id)?;
        self.relay.handle_chat(key, text.to_string()).await
    }

    /// Wait for every started delegation to finish.
    ///
    /// Closes the tracker, so the harness accepts no further delegations.
    pub async fn settle(&self) -> bool {
        self.tracker.drain(Duration::from_secs(10)).await
    }

    /// Messages stored for a conversation, oldest first.
    pub async fn messages(&self, key: &ConversationKey) -> Vec<Message> {
        MessageStore::new(self.store.clone())
            .list(key)
            .await
            .unwrap_or_default()
    }

    /// Current value of the typing flag; absence reads as `false`.
    pub async fn typing(&self, key: &ConversationKey) -> bool {
        use waypoint_core::RealtimeStore;
        matches!(
            self.store.get(&key.typing_path()).await,
            Ok(Some(Value::Bool(true)))
        )
    }
}
