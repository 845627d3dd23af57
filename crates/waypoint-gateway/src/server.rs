// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use waypoint_core::{RealtimeStore, RelayError};
use waypoint_relay::ChatRelay;
use waypoint_store::ItineraryStateStore;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, itinerary};

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: ChatRelay,
    pub store: Arc<dyn RealtimeStore>,
    pub itineraries: ItineraryStateStore,
    /// Token guarding the itinerary tool routes.
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Listener address (mirrors `ServerConfig` from waypoint-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Assemble the router.
///
/// - POST /chat
/// - GET /health
/// - GET /v1/delegations
/// - GET|PUT|PATCH /v1/itineraries/{user_id}/{itinerary_id}/state (bearer auth,
///   only mounted when a tool token is configured)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/chat", post(handlers::post_chat))
        .route("/health", get(handlers::get_health))
        .route("/v1/delegations", get(handlers::get_delegations))
        .with_state(state.clone());

    let mut app = Router::new().merge(public_routes);

    if auth_state.bearer_token.is_some() {
        let tool_routes = Router::new()
            .route(
                "/v1/itineraries/{user_id}/{itinerary_id}/state",
                get(itinerary::get_state)
                    .put(itinerary::put_state)
                    .patch(itinerary::patch_state),
            )
            .route_layer(axum_middleware::from_fn_with_state(
                auth_state,
                auth_middleware,
            ))
            .with_state(state);
        app = app.merge(tool_routes);
    } else {
        tracing::info!("no tool token configured, itinerary tool routes disabled");
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), RelayError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        RelayError::Config(format!("failed to bind gateway to {addr}: {e}"))
    })?;

    tracing::info!(addr = %addr, "gateway server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| RelayError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway server stopped");
    Ok(())
}
