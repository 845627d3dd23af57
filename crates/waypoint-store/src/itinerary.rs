// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured itinerary state and its store.
//!
//! The state lives at `users/{user_id}/itineraries/{itinerary_id}/itinerary_state`
//! and is mutated either wholesale or one dotted field path at a time. Updates
//! are read-modify-write without optimistic concurrency: two concurrent
//! updates to the same conversation can lose one of the writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use waypoint_core::{ConversationKey, RealtimeStore, RelayError};

/// A trip plan. Unknown fields are preserved verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryState {
    #[serde(default)]
    pub trip: TripSummary,
    #[serde(default)]
    pub days: Vec<ItineraryDay>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travelers: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One day of the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_ref: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Shape of a pre-created plan file: `{"state": {...}}`.
#[derive(Deserialize)]
struct SeedPlan {
    state: Option<Value>,
}

/// Reads and mutates the itinerary state of a conversation.
#[derive(Clone)]
pub struct ItineraryStateStore {
    store: Arc<dyn RealtimeStore>,
    seed_plan: Option<PathBuf>,
}

impl ItineraryStateStore {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            store,
            seed_plan: None,
        }
    }

    /// Use the plan at `path` for conversations that have no stored state.
    pub fn with_seed_plan(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_plan = Some(path.into());
        self
    }

    /// The stored state, or the empty default when nothing is stored.
    pub async fn get(&self, key: &ConversationKey) -> Result<ItineraryState, RelayError> {
        Ok(self.load(key).await?.unwrap_or_default())
    }

    /// Replace the whole document.
    pub async fn replace(
        &self,
        key: &ConversationKey,
        state: &ItineraryState,
    ) -> Result<(), RelayError> {
        let path = key.itinerary_state_path();
        let value = serde_json::to_value(state).map_err(|e| RelayError::Persistence {
            path: path.clone(),
            message: format!("failed to encode itinerary state: {e}"),
            source: Some(Box::new(e)),
        })?;
        self.store.set(&path, value).await?;
        debug!(conversation = %key, "itinerary state replaced");
        Ok(())
    }

    /// Set the value at a dotted field path such as `days.0.activities.1.name`.
    ///
    /// Numeric segments index arrays; every segment but the last must exist.
    /// The update is rejected, and nothing written, when the result no longer
    /// decodes as an [`ItineraryState`].
    pub async fn update_field(
        &self,
        key: &ConversationKey,
        field: &str,
        value: Value,
    ) -> Result<ItineraryState, RelayError> {
        let current = self.get(key).await?;
        let mut doc = serde_json::to_value(&current).map_err(|e| RelayError::Internal(format!(
            "failed to encode itinerary state: {e}"
        )))?;
        set_field(&mut doc, field, value)?;

        let updated: ItineraryState =
            serde_json::from_value(doc).map_err(|e| RelayError::InvalidFieldPath {
                path: field.to_string(),
                reason: format!("value does not fit the itinerary: {e}"),
            })?;
        self.replace(key, &updated).await?;
        debug!(conversation = %key, field, "itinerary field updated");
        Ok(updated)
    }

    /// Return the stored state, seeding it from the configured plan first
    /// when the conversation has none.
    pub async fn load_or_seed(&self, key: &ConversationKey) -> Result<ItineraryState, RelayError> {
        if let Some(state) = self.load(key).await? {
            return Ok(state);
        }
        let seeded = match &self.seed_plan {
            Some(path) => read_seed_plan(path).await,
            None => ItineraryState::default(),
        };
        // Firebase stores nothing for an empty document.
        if seeded == ItineraryState::default() {
            debug!(conversation = %key, "no seed plan content, itinerary left unstored");
            return Ok(seeded);
        }
        self.replace(key, &seeded).await?;
        info!(conversation = %key, "itinerary state seeded");
        Ok(seeded)
    }

    async fn load(&self, key: &ConversationKey) -> Result<Option<ItineraryState>, RelayError> {
        let path = key.itinerary_state_path();
        match self.store.get(&path).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RelayError::Decode {
                    message: format!("stored itinerary state at `{path}` is malformed: {e}"),
                    source: Some(Box::new(e)),
                }),
        }
    }
}

/// Read a pre-created plan; a missing or malformed file yields the empty state.
pub async fn read_seed_plan(path: &Path) -> ItineraryState {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "seed plan unreadable, using empty itinerary");
            return ItineraryState::default();
        }
    };
    let parsed = serde_json::from_str::<SeedPlan>(&raw)
        .ok()
        .and_then(|plan| plan.state)
        .filter(Value::is_object)
        .map(serde_json::from_value::<ItineraryState>);
    match parsed {
        Some(Ok(state)) => {
            info!(path = %path.display(), "loaded seed plan");
            state
        }
        _ => {
            warn!(path = %path.display(), "seed plan malformed, using empty itinerary");
            ItineraryState::default()
        }
    }
}

/// Write `value` at the dotted `field` path inside `doc`.
pub fn set_field(doc: &mut Value, field: &str, value: Value) -> Result<(), RelayError> {
    let invalid = |reason: String| RelayError::InvalidFieldPath {
        path: field.to_string(),
        reason,
    };

    let segs: Vec<&str> = field.split('.').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(invalid("empty path segment".to_string()));
    }
    let Some((last, parents)) = segs.split_last() else {
        return Err(invalid("empty path".to_string()));
    };

    let mut node = doc;
    for seg in parents {
        node = match node {
            Value::Object(map) => map
                .get_mut(*seg)
                .ok_or_else(|| invalid(format!("`{seg}` does not exist")))?,
            Value::Array(items) => {
                let index = parse_index(seg).ok_or_else(|| {
                    invalid(format!("`{seg}` is not an index into a list"))
                })?;
                let len = items.len();
                items.get_mut(index).ok_or_else(|| {
                    invalid(format!("index {index} out of range (length {len})"))
                })?
            }
            _ => return Err(invalid(format!("`{seg}` is inside a scalar value"))),
        };
    }

    match node {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(last)
                .ok_or_else(|| invalid(format!("`{last}` is not an index into a list")))?;
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or_else(|| invalid(format!("index {index} out of range (length {len})")))?;
            *slot = value;
            Ok(())
        }
        _ => Err(invalid(format!("`{last}` is inside a scalar value"))),
    }
}

fn parse_index(seg: &str) -> Option<usize> {
    if seg.chars().all(|c| c.is_ascii_digit()) {
        seg.parse().ok()
    } else {
        None
    }
}
