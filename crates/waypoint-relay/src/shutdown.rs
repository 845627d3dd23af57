// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the HTTP server watches. In-flight delegations
//! are then drained so no conversation is left with `typing = true`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tracker::DelegationTracker;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Close the tracker and wait up to `timeout` for running delegations.
pub async fn drain_delegations(tracker: &DelegationTracker, timeout: Duration) {
    let drained = tracker.drain(timeout).await;
    let stuck = tracker.stuck();
    if !drained || !stuck.is_empty() {
        warn!(
            in_flight = tracker.in_flight(),
            typing_stuck = stuck.len(),
            "shutdown left conversations that may still show typing"
        );
    }
}
