// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort "typing" presence flag.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use waypoint_core::{ConversationKey, RealtimeStore};

/// Sets and clears the per-conversation typing flag.
///
/// Failures are logged and never returned; the return value only reports
/// whether the write landed so callers can record it.
#[derive(Clone)]
pub struct PresenceSignal {
    store: Arc<dyn RealtimeStore>,
}

impl PresenceSignal {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    pub async fn set_typing(&self, key: &ConversationKey, typing: bool) -> bool {
        match self.store.set(&key.typing_path(), Value::Bool(typing)).await {
            Ok(()) => {
                debug!(conversation = %key, typing, "typing flag written");
                true
            }
            Err(e) => {
                warn!(conversation = %key, typing, error = %e, "failed to write typing flag");
                false
            }
        }
    }
}
