// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation, message, and agent result types shared by every crate.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::RelayError;

/// Maximum byte length of a single database key segment.
const MAX_KEY_BYTES: usize = 768;

/// Characters the real-time database refuses inside a key.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '$', '#', '[', ']'];

/// Relative key of the message collection under a conversation's `messages` node.
pub const MESSAGE_COLLECTION_KEY: &str = "message_id";

/// Relative key of the typing flag under a conversation's `messages` node.
pub const TYPING_KEY: &str = "typing";

/// Default `message_type` for chat messages.
pub const DEFAULT_MESSAGE_TYPE: &str = "text";

/// Identifies one chat thread: a user's conversation about one itinerary.
///
/// Both components are validated against the database key rules so that the
/// derived paths are injective: two distinct keys never share a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConversationKey {
    user_id: String,
    itinerary_id: String,
}

impl ConversationKey {
    /// Build a key, rejecting components that would escape their path segment.
    pub fn new(
        user_id: impl Into<String>,
        itinerary_id: impl Into<String>,
    ) -> Result<Self, RelayError> {
        let user_id = user_id.into();
        let itinerary_id = itinerary_id.into();
        validate_segment("user_id", &user_id)?;
        validate_segment("itinerary_id", &itinerary_id)?;
        Ok(Self {
            user_id,
            itinerary_id,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn itinerary_id(&self) -> &str {
        &self.itinerary_id
    }

    /// `users/{user_id}/itineraries/{itinerary_id}`
    pub fn root_path(&self) -> String {
        format!("users/{}/itineraries/{}", self.user_id, self.itinerary_id)
    }

    /// The node holding both the message collection and the typing flag.
    pub fn messages_node(&self) -> String {
        format!("{}/messages", self.root_path())
    }

    pub fn message_collection_path(&self) -> String {
        format!("{}/{MESSAGE_COLLECTION_KEY}", self.messages_node())
    }

    pub fn message_path(&self, message_id: &str) -> String {
        format!("{}/{message_id}", self.message_collection_path())
    }

    pub fn typing_path(&self) -> String {
        format!("{}/{TYPING_KEY}", self.messages_node())
    }

    pub fn itinerary_state_path(&self) -> String {
        format!("{}/itinerary_state", self.root_path())
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.itinerary_id)
    }
}

fn validate_segment(field: &str, value: &str) -> Result<(), RelayError> {
    if value.is_empty() {
        return Err(RelayError::InvalidKey(format!("{field} must not be empty")));
    }
    if value.len() > MAX_KEY_BYTES {
        return Err(RelayError::InvalidKey(format!(
            "{field} exceeds {MAX_KEY_BYTES} bytes"
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_ascii_control())
    {
        return Err(RelayError::InvalidKey(format!(
            "{field} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    User,
    Model,
}

/// An immutable chat message as stored in the real-time database.
///
/// Field names on the wire follow the client contract, which mixes
/// snake_case and camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Writer-generated UUID; also the message's key in the collection.
    pub id: String,
    pub sender: Sender,
    #[serde(rename = "message")]
    pub text: String,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(rename = "activityType", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_object: Option<String>,
    #[serde(rename = "bookingRef", default, skip_serializing_if = "Option::is_none")]
    pub booking_ref: Option<String>,
}

fn default_message_type() -> String {
    DEFAULT_MESSAGE_TYPE.to_string()
}

impl Message {
    /// Create a plain text message with a fresh UUID and the current UTC time.
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            message_type: default_message_type(),
            activity_type: None,
            activity_object: None,
            booking_ref: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Sender::Model, text)
    }
}

/// Normalized outcome of one round trip to the remote agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInvocationResult {
    pub ok: bool,
    pub text: String,
    pub error: Option<String>,
}

impl AgentInvocationResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}
