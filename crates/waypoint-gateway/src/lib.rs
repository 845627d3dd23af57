// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Waypoint chat relay.
//!
//! Exposes `POST /chat` to clients, health and delegation status for
//! operators, and bearer-authenticated itinerary state routes for the
//! remote agent.

pub mod auth;
pub mod handlers;
pub mod itinerary;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, build_router, start_server};
