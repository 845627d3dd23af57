// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `waypoint serve` command implementation.
//!
//! Wires the store, agent client, relay, and gateway together, serves until
//! a shutdown signal arrives, then drains in-flight delegations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use waypoint_agent::RemoteAgentClient;
use waypoint_config::model::{LoggingConfig, WaypointConfig};
use waypoint_core::{HealthStatus, RealtimeStore, RelayError, ServiceAdapter};
use waypoint_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};
use waypoint_relay::{ChatRelay, DelegationTracker, drain_delegations, install_signal_handler};
use waypoint_store::ItineraryStateStore;

/// Runs the `waypoint serve` command.
///
/// `dotenv` is the `.env` file loaded at startup, logged once tracing is up.
pub async fn run_serve(config: WaypointConfig, dotenv: Option<PathBuf>) -> Result<(), RelayError> {
    init_tracing(&config.logging);
    if let Some(path) = &dotenv {
        debug!(path = %path.display(), "loaded .env file");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting waypoint serve");

    let store = waypoint_store::open_store(&config.database).await?;
    probe_store(store.as_ref()).await?;

    let agent = Arc::new(RemoteAgentClient::new(&config.agent)?);
    let tracker = Arc::new(DelegationTracker::new(config.delegation.history_limit));
    let relay = ChatRelay::new(store.clone(), agent, tracker.clone());

    let mut itineraries = ItineraryStateStore::new(store.clone());
    if let Some(path) = &config.itinerary.seed_plan_path {
        itineraries = itineraries.with_seed_plan(path);
    }

    let state = GatewayState {
        relay,
        store,
        itineraries,
        auth: AuthConfig {
            bearer_token: config.server.tool_token.clone(),
        },
        health: HealthState {
            start_time: Instant::now(),
        },
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    let cancel = install_signal_handler();
    let served = waypoint_gateway::start_server(&server_config, state, cancel.clone()).await;
    cancel.cancel();

    drain_delegations(
        &tracker,
        Duration::from_secs(config.delegation.drain_timeout_secs),
    )
    .await;

    served?;
    info!("waypoint serve shutdown complete");
    Ok(())
}

/// Refuse to start when the database cannot be reached.
async fn probe_store(store: &dyn RealtimeStore) -> Result<(), RelayError> {
    match store.health_check().await? {
        HealthStatus::Healthy => {
            info!(store = store.name(), "database reachable");
            Ok(())
        }
        HealthStatus::Degraded(reason) => {
            warn!(store = store.name(), reason = %reason, "database degraded, starting anyway");
            Ok(())
        }
        HealthStatus::Unhealthy(reason) => Err(RelayError::Config(format!(
            "database `{}` is unreachable: {reason}",
            store.name()
        ))),
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("waypoint={level},tower_http={level},warn")));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(false)
            .init();
    }
}
