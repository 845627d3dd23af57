// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the chat relay endpoints.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use waypoint_core::{ConversationKey, HealthStatus, RelayError, ServiceAdapter};
use waypoint_relay::{ChatAccepted, DelegationRecord};

use crate::server::GatewayState;

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub itinerary_id: String,
    pub message: String,
}

/// Error body shared by every route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Response for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub store: String,
}

/// Response for GET /v1/delegations.
#[derive(Debug, Serialize)]
pub struct DelegationsResponse {
    pub in_flight: usize,
    pub counts: BTreeMap<String, usize>,
    pub delegations: Vec<DelegationRecord>,
}

/// A [`RelayError`] rendered as `{detail}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status = match &err {
            RelayError::InvalidKey(_) | RelayError::InvalidFieldPath { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

/// POST /chat -- persist the user message and start a background delegation.
///
/// Returns as soon as the user message is stored; the model reply arrives
/// later through the database.
pub async fn post_chat(
    State(state): State<GatewayState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatAccepted>, ApiError> {
    let Json(request) = payload?;
    let key = ConversationKey::new(request.user_id, request.itinerary_id)?;
    let accepted = state.relay.handle_chat(key, request.message).await?;
    Ok(Json(accepted))
}

/// GET /health -- process and store health. No auth required.
pub async fn get_health(State(state): State<GatewayState>) -> impl IntoResponse {
    let store = match state.store.health_check().await {
        Ok(status) => status,
        Err(e) => HealthStatus::Unhealthy(e.to_string()),
    };
    let (code, status) = match &store {
        HealthStatus::Healthy => (StatusCode::OK, "healthy"),
        HealthStatus::Degraded(_) => (StatusCode::OK, "degraded"),
        HealthStatus::Unhealthy(_) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        store: store.to_string(),
    };
    (code, Json(body))
}

/// GET /v1/delegations -- recent delegation records, newest first.
pub async fn get_delegations(State(state): State<GatewayState>) -> Json<DelegationsResponse> {
    let tracker = state.relay.tracker();
    Json(DelegationsResponse {
        in_flight: tracker.in_flight(),
        counts: tracker.counts(),
        delegations: tracker.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_deserialization() {
        let json = r#"{"user_id": "user123", "itinerary_id": "itinerary456", "message": "Plan Paris"}"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.user_id, "user123");
        assert_eq!(req.message, "Plan Paris");
    }

    #[test]
    fn chat_request_requires_all_fields() {
        let json = r#"{"user_id": "user123", "message": "Plan Paris"}"#;
        assert!(serde_json::from_str::<ChatRequest>(json).is_err());
    }

    #[test]
    fn relay_errors_map_to_status_codes() {
        let invalid: ApiError = RelayError::InvalidKey("bad".into()).into();
        assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);

        let persistence: ApiError = RelayError::persistence("users/a", "denied").into();
        assert_eq!(persistence.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(persistence.detail.contains("denied"));

        let field: ApiError = RelayError::InvalidFieldPath {
            path: "days.9".into(),
            reason: "index out of range".into(),
        }
        .into();
        assert_eq!(field.status, StatusCode::UNPROCESSABLE_ENTITY);

        let slow: ApiError = RelayError::Timeout {
            duration: std::time::Duration::from_secs(10),
        }
        .into();
        assert_eq!(slow.status, StatusCode::GATEWAY_TIMEOUT);
    }
}
