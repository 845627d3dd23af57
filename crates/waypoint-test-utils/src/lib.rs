// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Waypoint integration tests.
//!
//! Provides fake adapters and a relay harness for fast, deterministic,
//! CI-runnable tests without a database or agent process.
//!
//! # Components
//!
//! - [`ScriptedAgent`] - Agent with queued replies, failures, panics, and a release gate
//! - [`RecordingStore`] - Memory store with a write log and failure injection
//! - [`RelayHarness`] - A `ChatRelay` wired to both

pub mod harness;
pub mod mock_agent;
pub mod recording_store;

pub use harness::RelayHarness;
pub use mock_agent::{ScriptedAgent, ScriptedOutcome};
pub use recording_store::{RecordingStore, StoreWrite, clears_typing};
