// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the relay's external collaborators.
//!
//! Both adapters extend the [`ServiceAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod agent;
pub mod store;

pub use adapter::ServiceAdapter;
pub use agent::AgentInvoker;
pub use store::RealtimeStore;
