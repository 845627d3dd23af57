// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of the remote agent's reply body.
//!
//! The agent answers `{"result": ..., "error": ...}`. `result` is usually a
//! string holding a second JSON document, the envelope `{"result", "state"}`;
//! older agents return plain text there instead.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use waypoint_core::AgentInvocationResult;

/// Error text when the reply carries neither a result nor an error.
pub const UNKNOWN_AGENT_ERROR: &str = "Unknown error from agent";

/// Top-level reply body.
#[derive(Debug, Default, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Normalize a decoded reply into an [`AgentInvocationResult`].
pub fn interpret(reply: AgentReply) -> AgentInvocationResult {
    match reply.result {
        Some(Value::String(raw)) => AgentInvocationResult::success(unwrap_envelope_str(raw)),
        Some(Value::Object(envelope)) => {
            AgentInvocationResult::success(envelope_text(&Value::Object(envelope)))
        }
        Some(Value::Null) | None => {
            let error = reply
                .error
                .unwrap_or_else(|| UNKNOWN_AGENT_ERROR.to_string());
            warn!(error = %error, "agent returned an error");
            AgentInvocationResult::failure(error)
        }
        Some(other) => AgentInvocationResult::success(other.to_string()),
    }
}

/// Decode the reply body; a body that is not a reply object counts as unknown.
pub fn interpret_body(body: &str) -> AgentInvocationResult {
    match serde_json::from_str::<AgentReply>(body) {
        Ok(reply) => interpret(reply),
        Err(e) => {
            warn!(error = %e, "agent reply is not a JSON object");
            AgentInvocationResult::failure(UNKNOWN_AGENT_ERROR)
        }
    }
}

/// Text of a `result` string, unwrapping the nested envelope when present.
fn unwrap_envelope_str(raw: String) -> String {
    match serde_json::from_str::<Value>(&raw) {
        Ok(envelope @ Value::Object(_)) => envelope_text(&envelope),
        _ => {
            debug!("agent result is plain text");
            raw
        }
    }
}

fn envelope_text(envelope: &Value) -> String {
    if let Some(state) = envelope.get("state") {
        debug!(state = %state, "agent reported itinerary state");
    }
    match envelope.get("result") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
