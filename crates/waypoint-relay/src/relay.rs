// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handling and background delegation.
//!
//! A chat request moves through
//! `Received -> UserMessagePersisted -> TypingSet -> Delegated -> Responded`;
//! the response is returned before the agent is contacted. The detached
//! delegation always ends by writing a model reply and clearing the typing
//! flag, whatever the agent did.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{Instrument, error, info, info_span, instrument, warn};

use waypoint_core::{AgentInvoker, ConversationKey, Message, RealtimeStore, RelayError};
use waypoint_store::{MessageStore, PresenceSignal};

use crate::tracker::{DelegationStatus, DelegationTracker};

/// Body returned once a message is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAccepted {
    pub status: &'static str,
    pub message: &'static str,
    /// Background delegation handling this message.
    #[serde(skip)]
    pub delegation_id: String,
}

impl ChatAccepted {
    fn new(delegation_id: String) -> Self {
        Self {
            status: "success",
            message: "Message received and being processed",
            delegation_id,
        }
    }
}

/// Text of the model reply written when the agent call fails.
pub fn error_reply_text(error: &str) -> String {
    format!("Sorry, an error occurred: {error}")
}

/// Orchestrates persistence, presence, and delegation for chat requests.
#[derive(Clone)]
pub struct ChatRelay {
    messages: MessageStore,
    presence: PresenceSignal,
    agent: Arc<dyn AgentInvoker>,
    tracker: Arc<DelegationTracker>,
}

impl ChatRelay {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        agent: Arc<dyn AgentInvoker>,
        tracker: Arc<DelegationTracker>,
    ) -> Self {
        Self {
            messages: MessageStore::new(store.clone()),
            presence: PresenceSignal::new(store),
            agent,
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<DelegationTracker> {
        &self.tracker
    }

    /// Accept one user message.
    ///
    /// Fails only when the user message cannot be persisted, in which case no
    /// delegation is started. A failed typing write is logged and ignored.
    #[instrument(skip(self, text), fields(conversation = %key))]
    pub async fn handle_chat(
        &self,
        key: ConversationKey,
        text: String,
    ) -> Result<ChatAccepted, RelayError> {
        let user_message = Message::user(text.clone());
        if let Err(e) = self.messages.append(&key, &user_message).await {
            error!(error = %e, "failed to persist user message");
            return Err(e);
        }

        self.presence.set_typing(&key, true).await;

        let delegation_id = self.tracker.begin(&key);
        let delegation = Delegation {
            id: delegation_id.clone(),
            key,
            text,
            messages: self.messages.clone(),
            presence: self.presence.clone(),
            agent: self.agent.clone(),
            tracker: self.tracker.clone(),
        };
        let span = info_span!("delegation", delegation_id = %delegation_id);
        self.tracker.spawn(delegation.run().instrument(span));

        info!(delegation_id = %delegation_id, "message accepted, delegation started");
        Ok(ChatAccepted::new(delegation_id))
    }
}

/// Everything a detached delegation needs, owned so it can outlive the request.
struct Delegation {
    id: String,
    key: ConversationKey,
    text: String,
    messages: MessageStore,
    presence: PresenceSignal,
    agent: Arc<dyn AgentInvoker>,
    tracker: Arc<DelegationTracker>,
}

impl Delegation {
    async fn run(self) {
        let outcome = AssertUnwindSafe(self.deliver()).catch_unwind().await;
        let (status, error) = match outcome {
            Ok(done) => done,
            Err(panic) => {
                let err = panic_message(panic.as_ref());
                error!(error = %err, "delegation panicked after the agent call, clearing typing");
                let cleared = AssertUnwindSafe(self.presence.set_typing(&self.key, false))
                    .catch_unwind()
                    .await
                    .unwrap_or(false);
                let status = if cleared {
                    DelegationStatus::ReplyFailed
                } else {
                    error!("typing flag could not be cleared");
                    DelegationStatus::TypingStuck
                };
                (status, Some(err))
            }
        };

        self.tracker.finish(&self.id, status, error);
    }

    /// Call the agent, then write the reply and clear typing together.
    async fn deliver(&self) -> (DelegationStatus, Option<String>) {
        let invocation = AssertUnwindSafe(self.agent.invoke(&self.text))
            .catch_unwind()
            .await;

        let (reply_text, agent_error) = match invocation {
            Ok(result) if result.ok => (result.text, None),
            Ok(result) => {
                let err = result
                    .error
                    .unwrap_or_else(|| "unknown agent failure".to_string());
                warn!(error = %err, "agent call failed, replying with error");
                (error_reply_text(&err), Some(err))
            }
            Err(panic) => {
                let err = panic_message(panic.as_ref());
                error!(error = %err, "agent call panicked, replying with error");
                (error_reply_text(&err), Some(err))
            }
        };

        let reply = Message::model(reply_text);
        match self
            .messages
            .append_with_typing(&self.key, &reply, false)
            .await
        {
            Ok(()) => {
                let status = if agent_error.is_some() {
                    DelegationStatus::ErrorReplied
                } else {
                    DelegationStatus::Replied
                };
                info!(message_id = %reply.id, status = %status, "reply written, typing cleared");
                (status, agent_error)
            }
            Err(e) => {
                error!(error = %e, "failed to write reply, clearing typing on its own");
                let status = if self.presence.set_typing(&self.key, false).await {
                    DelegationStatus::ReplyFailed
                } else {
                    error!("typing flag could not be cleared");
                    DelegationStatus::TypingStuck
                };
                (status, Some(e.to_string()))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "delegation task panicked".to_string()
    }
}
