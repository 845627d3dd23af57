// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Itinerary state tool routes, used by the remote agent to read and edit
//! the plan behind a conversation.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;

use waypoint_core::ConversationKey;
use waypoint_store::ItineraryState;

use crate::handlers::ApiError;
use crate::server::GatewayState;

/// Body for PATCH .../state.
#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    /// Dotted path such as `days.0.activities.1.name`.
    pub field: String,
    pub value: Value,
}

/// GET .../state -- stored state, seeded from the plan file on first read.
pub async fn get_state(
    State(state): State<GatewayState>,
    Path((user_id, itinerary_id)): Path<(String, String)>,
) -> Result<Json<ItineraryState>, ApiError> {
    let key = ConversationKey::new(user_id, itinerary_id)?;
    Ok(Json(state.itineraries.load_or_seed(&key).await?))
}

/// PUT .../state -- replace the whole document.
pub async fn put_state(
    State(state): State<GatewayState>,
    Path((user_id, itinerary_id)): Path<(String, String)>,
    payload: Result<Json<ItineraryState>, JsonRejection>,
) -> Result<Json<ItineraryState>, ApiError> {
    let key = ConversationKey::new(user_id, itinerary_id)?;
    let Json(document) = payload?;
    state.itineraries.replace(&key, &document).await?;
    Ok(Json(document))
}

/// PATCH .../state -- set one field and return the updated document.
pub async fn patch_state(
    State(state): State<GatewayState>,
    Path((user_id, itinerary_id)): Path<(String, String)>,
    payload: Result<Json<FieldUpdate>, JsonRejection>,
) -> Result<Json<ItineraryState>, ApiError> {
    let key = ConversationKey::new(user_id, itinerary_id)?;
    let Json(update) = payload?;
    let updated = state
        .itineraries
        .update_field(&key, &update.field, update.value)
        .await?;
    tracing::info!(conversation = %key, field = %update.field, "itinerary field set by tool");
    Ok(Json(updated))
}
