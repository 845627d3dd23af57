// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Waypoint chat relay.
//!
//! This crate provides the error type, the conversation and message types,
//! and the adapter traits for the two external collaborators: the real-time
//! database and the remote reasoning agent.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use traits::{AgentInvoker, RealtimeStore, ServiceAdapter};
pub use types::{AgentInvocationResult, ConversationKey, HealthStatus, Message, Sender};
