// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote agent adapter for the Waypoint chat relay.
//!
//! Implements [`AgentInvoker`](waypoint_core::AgentInvoker) over HTTP. The
//! agent owns all language understanding and itinerary reasoning; this crate
//! only delivers one message and normalizes one reply.

pub mod client;
pub mod reply;

pub use client::{CONNECT_ERROR, RemoteAgentClient, URL_MISSING_ERROR};
pub use reply::UNKNOWN_AGENT_ERROR;
